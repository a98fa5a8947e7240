use serde_json::Value;
use tracing::debug;

use crate::domain::{FlybaseId, GENE_KIND, GeneId, is_canonical_shape};
use crate::error::FetchError;
use crate::flybase::FlybaseClient;
use crate::scan;

/// Turns a free-text query into a resolved gene id.
///
/// Queries already in canonical shape never touch the network: gene ids are
/// accepted as-is (normalized), other record kinds are rejected instead of
/// being silently lifted to their parent gene. Anything else goes through
/// the hitlist search endpoint and a depth-first scan for the first
/// FBgn-shaped string; first match in traversal order wins.
pub fn resolve(client: &dyn FlybaseClient, query: &str) -> Result<GeneId, FetchError> {
    let trimmed = query.trim();
    if let Some(id) = FlybaseId::parse(trimmed) {
        let id = GeneId::try_from(id)?;
        debug!(%id, "query already canonical, skipping search");
        return Ok(id);
    }

    let payload = client.search_hits(trimmed)?;
    let result = payload.get("result").cloned().unwrap_or(Value::Null);
    let is_gene_id =
        |value: &str| is_canonical_shape(value) && value[2..4].eq_ignore_ascii_case(GENE_KIND);

    match scan::find_first(&result, &is_gene_id) {
        Some(found) => {
            let id: GeneId = found.parse()?;
            debug!(query = trimmed, %id, "resolved via hitlist search");
            Ok(id)
        }
        None => Err(FetchError::ResolutionFailed(query.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::{Value, json};

    use super::*;

    /// Panics on any endpoint except search, so tests can prove which calls
    /// were (not) made.
    struct SearchOnly {
        hits: Value,
    }

    impl FlybaseClient for SearchOnly {
        fn search_hits(&self, _query: &str) -> Result<Value, FetchError> {
            Ok(self.hits.clone())
        }
        fn species_lookup(&self, _id: &GeneId) -> Result<Value, FetchError> {
            unreachable!("resolver must not fetch species")
        }
        fn auto_summary(&self, _id: &GeneId) -> Result<Value, FetchError> {
            unreachable!("resolver must not fetch summaries")
        }
        fn chado_xml(&self, _id: &GeneId) -> Result<String, FetchError> {
            unreachable!("resolver must not fetch chadoxml")
        }
        fn sequences(&self, _id: &GeneId, _subtype: &str) -> Result<Value, FetchError> {
            unreachable!("resolver must not fetch sequences")
        }
        fn hitlist(&self, _id: &GeneId) -> Result<Value, FetchError> {
            unreachable!("resolver must not fetch the id hitlist")
        }
    }

    struct NoNetwork;

    impl FlybaseClient for NoNetwork {
        fn search_hits(&self, _query: &str) -> Result<Value, FetchError> {
            unreachable!("canonical queries must not search")
        }
        fn species_lookup(&self, _id: &GeneId) -> Result<Value, FetchError> {
            unreachable!()
        }
        fn auto_summary(&self, _id: &GeneId) -> Result<Value, FetchError> {
            unreachable!()
        }
        fn chado_xml(&self, _id: &GeneId) -> Result<String, FetchError> {
            unreachable!()
        }
        fn sequences(&self, _id: &GeneId, _subtype: &str) -> Result<Value, FetchError> {
            unreachable!()
        }
        fn hitlist(&self, _id: &GeneId) -> Result<Value, FetchError> {
            unreachable!()
        }
    }

    #[test]
    fn canonical_gene_id_passes_through_without_network() {
        let id = resolve(&NoNetwork, "FBgn0000099").unwrap();
        assert_eq!(id.as_str(), "FBgn0000099");

        let id = resolve(&NoNetwork, " fbgn0000099 ").unwrap();
        assert_eq!(id.as_str(), "FBgn0000099");
    }

    #[test]
    fn derived_record_ids_are_rejected_without_network() {
        let err = resolve(&NoNetwork, "FBpp0070001").unwrap_err();
        assert_matches!(err, FetchError::UnsupportedIdentifierKind(_));
    }

    #[test]
    fn free_text_resolves_via_first_gene_shaped_hit() {
        let client = SearchOnly {
            hits: json!({
                "counts": {"genes": 2},
                "result": [
                    {"symbol": "so", "allele": "FBal0000123"},
                    {"nested": [{"id": "FBgn0003460"}]},
                    {"id": "FBgn0000099"}
                ]
            }),
        };
        let id = resolve(&client, "so").unwrap();
        assert_eq!(id.as_str(), "FBgn0003460");
    }

    #[test]
    fn unresolvable_text_fails() {
        let client = SearchOnly {
            hits: json!({"counts": {}, "result": []}),
        };
        let err = resolve(&client, "definitely-not-a-gene").unwrap_err();
        assert_matches!(err, FetchError::ResolutionFailed(_));
    }
}

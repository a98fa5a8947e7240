use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::chado;
use crate::config::{FetchConfig, user_agent};
use crate::domain::{
    ALLELE_KIND, GeneId, GeneRecord, GeneSequences, RelatedRecords, STOCK_KIND, SequenceRecord,
    SpeciesInfo, is_canonical_shape,
};
use crate::error::FetchError;
use crate::scan;

/// One method per FlyBase endpoint the pipeline touches. Payloads come back
/// raw; field extraction lives in the free functions below so it can be
/// tested without a server.
pub trait FlybaseClient: Send + Sync {
    /// GET `/hitlist/fetch/{query}` with free text.
    fn search_hits(&self, query: &str) -> Result<Value, FetchError>;
    /// GET `/species/lookup/{id}`.
    fn species_lookup(&self, id: &GeneId) -> Result<Value, FetchError>;
    /// GET `/gene/summaries/auto/{id}`.
    fn auto_summary(&self, id: &GeneId) -> Result<Value, FetchError>;
    /// GET `/chadoxml/{id}`, returning the XML body verbatim.
    fn chado_xml(&self, id: &GeneId) -> Result<String, FetchError>;
    /// GET `/sequence/id/{id}/{subtype}` where subtype is FBgn/FBtr/FBpp.
    fn sequences(&self, id: &GeneId, subtype: &str) -> Result<Value, FetchError>;
    /// GET `/hitlist/fetch/{id}` with a resolved gene id.
    fn hitlist(&self, id: &GeneId) -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct FlybaseHttpClient {
    client: Client,
    base_url: String,
}

impl FlybaseHttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent())
                .map_err(|err| FetchError::Filesystem(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| FetchError::fetch_failed(&config.flybase_base_url, &err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.flybase_base_url.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| FetchError::fetch_failed(&self.base_url, &err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::fetch_failed(&self.base_url, "base url cannot carry a path"))?
            .extend(segments);
        Ok(url)
    }

    fn get_with_retries(
        &self,
        url: &Url,
        accept: &'static str,
    ) -> Result<reqwest::blocking::Response, FetchError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = self
                .client
                .get(url.clone())
                .header(ACCEPT, accept)
                .send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::fetch_failed(url.as_str(), &err.to_string()));
                }
            }
        }
    }

    fn get_text(&self, url: &Url, accept: &'static str) -> Result<String, FetchError> {
        debug!(url = %url, "flybase.request");
        let response = self.get_with_retries(url, accept)?;
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::fetch_failed(url.as_str(), &body));
        }
        response
            .text()
            .map_err(|err| FetchError::fetch_failed(url.as_str(), &err.to_string()))
    }

    fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        let body = self.get_text(url, "application/json")?;
        serde_json::from_str(&body).map_err(|_| FetchError::fetch_failed(url.as_str(), &body))
    }
}

impl FlybaseClient for FlybaseHttpClient {
    fn search_hits(&self, query: &str) -> Result<Value, FetchError> {
        let url = self.endpoint(&["hitlist", "fetch", query])?;
        self.get_json(&url)
    }

    fn species_lookup(&self, id: &GeneId) -> Result<Value, FetchError> {
        let url = self.endpoint(&["species", "lookup", id.as_str()])?;
        self.get_json(&url)
    }

    fn auto_summary(&self, id: &GeneId) -> Result<Value, FetchError> {
        let url = self.endpoint(&["gene", "summaries", "auto", id.as_str()])?;
        self.get_json(&url)
    }

    fn chado_xml(&self, id: &GeneId) -> Result<String, FetchError> {
        let url = self.endpoint(&["chadoxml", id.as_str()])?;
        self.get_text(&url, "application/xml")
    }

    fn sequences(&self, id: &GeneId, subtype: &str) -> Result<Value, FetchError> {
        let url = self.endpoint(&["sequence", "id", id.as_str(), subtype])?;
        self.get_json(&url)
    }

    fn hitlist(&self, id: &GeneId) -> Result<Value, FetchError> {
        let url = self.endpoint(&["hitlist", "fetch", id.as_str()])?;
        self.get_json(&url)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Runs every attribute fetcher for one resolved gene. Each facet is
/// independent: a failed call degrades to that facet's documented default
/// instead of aborting, so a partial record is still saveable.
pub fn build_record(client: &dyn FlybaseClient, id: &GeneId) -> GeneRecord {
    let mut record = GeneRecord::empty(id.clone());

    match client.species_lookup(id) {
        Ok(payload) => record.species = extract_species(&payload),
        Err(err) => warn!(id = %id, %err, "species lookup failed, keeping blanks"),
    }

    match client.auto_summary(id) {
        Ok(payload) => record.summary = extract_summary(&payload),
        Err(err) => warn!(id = %id, %err, "summary fetch failed, keeping placeholder"),
    }

    match client.chado_xml(id) {
        Ok(xml) => record.location = chado::parse_location(&xml),
        Err(err) => warn!(id = %id, %err, "chadoxml fetch failed, keeping Unknown location"),
    }

    record.sequences = GeneSequences {
        gene: fetch_sequence_variant(client, id, "FBgn"),
        transcripts: fetch_sequence_variant(client, id, "FBtr"),
        proteins: fetch_sequence_variant(client, id, "FBpp"),
    };

    match client.hitlist(id) {
        Ok(payload) => record.related = extract_related(&payload),
        Err(err) => warn!(id = %id, %err, "hitlist fetch failed, keeping empty lists"),
    }

    record
}

fn fetch_sequence_variant(
    client: &dyn FlybaseClient,
    id: &GeneId,
    subtype: &str,
) -> Vec<SequenceRecord> {
    match client.sequences(id, subtype) {
        Ok(payload) => extract_sequences(&payload),
        Err(err) => {
            debug!(id = %id, subtype, %err, "sequence fetch failed, keeping empty list");
            Vec::new()
        }
    }
}

pub fn extract_species(payload: &Value) -> SpeciesInfo {
    let first = payload
        .get("result")
        .and_then(|v| v.as_array())
        .and_then(|items| items.first());
    let field = |name: &str| {
        first
            .and_then(|entry| entry.get(name))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    SpeciesInfo {
        genus: field("genus"),
        species: field("species"),
        abbreviation: field("abbreviation"),
    }
}

pub fn extract_summary(payload: &Value) -> Option<String> {
    let entry = payload
        .get("result")
        .and_then(|v| v.as_array())
        .and_then(|items| items.first())?;
    entry
        .get("text")
        .and_then(|v| v.as_str())
        .or_else(|| entry.get("summary").and_then(|v| v.as_str()))
        .map(|v| v.to_string())
}

pub fn extract_sequences(payload: &Value) -> Vec<SequenceRecord> {
    payload
        .get("result")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn extract_related(payload: &Value) -> RelatedRecords {
    let result = payload.get("result").cloned().unwrap_or(Value::Array(Vec::new()));
    let counts = payload.get("counts");

    let of_kind = |kind: &'static str| {
        move |value: &str| {
            is_canonical_shape(value) && value[2..4].eq_ignore_ascii_case(kind)
        }
    };

    RelatedRecords {
        alleles: scan::collect_unique(&result, &of_kind(ALLELE_KIND)),
        stocks: scan::collect_unique(&result, &of_kind(STOCK_KIND)),
        allele_count: counts.and_then(|c| count_field(c, "FBal")),
        stock_count: counts.and_then(|c| count_field(c, "FBst")),
        raw: result,
    }
}

fn count_field(counts: &Value, key: &str) -> Option<String> {
    match counts.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

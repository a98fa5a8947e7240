use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::diopt::{self, DioptClient};
use crate::domain::{GeneId, Organism};
use crate::error::FetchError;
use crate::flybase::{self, FlybaseClient};
use crate::resolver;
use crate::workbook;

/// Outcome of one fetch-and-save invocation.
#[derive(Debug, Clone, Serialize)]
pub struct SaveResult {
    pub resolved_id: String,
    /// The original query, present only when it was not already the id.
    pub resolved_from_query: Option<String>,
    pub organism: Option<String>,
    pub output_path: Utf8PathBuf,
    pub fetched_at: String,
}

pub struct App<F: FlybaseClient, D: DioptClient> {
    flybase: F,
    diopt: D,
}

impl<F: FlybaseClient, D: DioptClient> App<F, D> {
    pub fn new(flybase: F, diopt: D) -> Self {
        Self { flybase, diopt }
    }

    /// Resolves `query`, fetches every gene facet (each degrading to its
    /// placeholder on failure), and writes the multi-sheet bundle.
    /// Resolution failures are fatal; facet failures are not.
    pub fn fetch_and_save(
        &self,
        query: &str,
        out_dir: &Utf8Path,
    ) -> Result<SaveResult, FetchError> {
        workbook::ensure_output_dir(out_dir)?;

        let id = resolver::resolve(&self.flybase, query)?;
        info!(query, %id, "resolved gene query");

        let record = flybase::build_record(&self.flybase, &id);
        let path = workbook::write_gene_bundle(&record, out_dir)?;

        Ok(SaveResult {
            resolved_from_query: (query.trim() != id.as_str()).then(|| query.trim().to_string()),
            resolved_id: id.to_string(),
            organism: None,
            output_path: path,
            fetched_at: iso_timestamp(),
        })
    }

    /// Fetches the DIOPT ortholog table for `id` against `organism` and
    /// writes it as a one-sheet bundle. All local preconditions (id shape,
    /// organism mapping, output folder) are checked before any HTTP call.
    pub fn fetch_orthologs_and_save(
        &self,
        id: &str,
        organism: &str,
        out_dir: &Utf8Path,
    ) -> Result<SaveResult, FetchError> {
        let gene: GeneId = id.parse().map_err(|err| match err {
            // The ortholog endpoint only ever takes gene ids; a derived
            // record id is just as invalid here as free text.
            FetchError::UnsupportedIdentifierKind(value) => FetchError::InvalidIdentifier(value),
            other => other,
        })?;
        let organism: Organism = organism.parse()?;
        workbook::ensure_output_dir(out_dir)?;

        let table = diopt::fetch_orthologs(&self.diopt, &gene, organism)?;
        info!(%gene, %organism, rows = table.rows.len(), "ortholog table fetched");

        let path = workbook::write_ortholog_bundle(&gene, organism, &table, out_dir)?;

        Ok(SaveResult {
            resolved_from_query: (id.trim() != gene.as_str()).then(|| id.trim().to_string()),
            resolved_id: gene.to_string(),
            organism: Some(organism.label().to_string()),
            output_path: path,
            fetched_at: iso_timestamp(),
        })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

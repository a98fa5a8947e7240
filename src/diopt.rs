use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use tracing::debug;

use crate::config::{FetchConfig, user_agent};
use crate::domain::{GeneId, Organism, OrthologTable};
use crate::error::FetchError;

/// Fly (D. melanogaster) is always the input species.
const INPUT_SPECIES: &str = "7227";

pub trait DioptClient: Send + Sync {
    /// Runs one ortholog query and returns the HTML result page.
    fn ortholog_page(&self, id: &GeneId, organism: Organism) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct DioptHttpClient {
    client: Client,
    base_url: String,
}

impl DioptHttpClient {
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
            .map_err(|err| FetchError::fetch_failed(&config.diopt_base_url, &err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.diopt_base_url.clone(),
        })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, FetchError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && matches!(status, 429 | 500 | 502 | 503 | 504) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES
                        && (err.is_timeout() || err.is_connect() || err.is_request())
                    {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(FetchError::fetch_failed(&self.base_url, &err.to_string()));
                }
            }
        }
    }
}

impl DioptClient for DioptHttpClient {
    fn ortholog_page(&self, id: &GeneId, organism: Organism) -> Result<String, FetchError> {
        debug!(%id, %organism, "diopt.request");
        let response = self.send_with_retries(|| {
            self.client.get(&self.base_url).query(&[
                ("gene_list", id.as_str()),
                ("input_species", INPUT_SPECIES),
                ("output_species", organism.taxon_id()),
                ("search_datasets", "All (max score = 10)"),
                ("search_fields", "FLYBASE"),
                ("additional_filter", "None"),
            ])
        })?;
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::fetch_failed(&self.base_url, &body));
        }
        response
            .text()
            .map_err(|err| FetchError::fetch_failed(&self.base_url, &err.to_string()))
    }
}

/// Fetches and parses the ortholog table for one gene/organism pair. The
/// identifier and organism are assumed already validated by the caller.
pub fn fetch_orthologs(
    client: &dyn DioptClient,
    id: &GeneId,
    organism: Organism,
) -> Result<OrthologTable, FetchError> {
    let html = client.ortholog_page(id, organism)?;
    let table = parse_ortholog_table(&html)?;
    if table.is_empty() {
        return Err(FetchError::EmptyResult(format!("{id} -> {organism}")));
    }
    Ok(table)
}

/// Extracts the first `<table>` of a DIOPT result page.
///
/// DIOPT pads its table with leading rows whose cells are all empty before
/// the real header. Skipping empty rows and promoting the next one is a
/// quirk of this one service, not a general HTML-table algorithm; if DIOPT
/// changes its filler-row count this will misparse silently. HTML entities
/// are decoded during parsing, so cell text needs no further unescaping.
pub fn parse_ortholog_table(html: &str) -> Result<OrthologTable, FetchError> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("th, td").unwrap();

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| FetchError::EmptyResult("no result table in response".to_string()))?;

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for row in table.select(&row_selector) {
        let cells = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect::<Vec<_>>();
        raw_rows.push(cells);
    }

    let mut rows = raw_rows.into_iter();
    let columns = loop {
        match rows.next() {
            Some(cells) if cells.iter().all(|cell| cell.is_empty()) => continue,
            Some(cells) => break cells,
            None => {
                return Err(FetchError::EmptyResult(
                    "result table has no header row".to_string(),
                ));
            }
        }
    };

    Ok(OrthologTable {
        columns,
        rows: rows.collect(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <tr><td></td><td></td><td></td></tr>
          <tr><td> </td><td></td><td></td></tr>
          <tr><th>Fly Gene</th><th>Human Gene</th><th>DIOPT Score</th></tr>
          <tr><td>so</td><td>SIX1 &amp; SIX2</td><td>10</td></tr>
          <tr><td>so</td><td>SIX4</td><td>6</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn skips_filler_rows_and_promotes_header() {
        let table = parse_ortholog_table(PAGE).unwrap();
        assert_eq!(table.columns, vec!["Fly Gene", "Human Gene", "DIOPT Score"]);
        // 5 raw rows minus 2 filler minus 1 header
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn entities_are_decoded() {
        let table = parse_ortholog_table(PAGE).unwrap();
        assert_eq!(table.rows[0][1], "SIX1 & SIX2");
    }

    #[test]
    fn page_without_table_is_empty_result() {
        let err = parse_ortholog_table("<html><body><p>no hits</p></body></html>").unwrap_err();
        assert_matches!(err, FetchError::EmptyResult(_));
    }

    #[test]
    fn header_only_table_yields_zero_rows() {
        let html = "<table><tr><th>A</th><th>B</th></tr></table>";
        let table = parse_ortholog_table(html).unwrap();
        assert!(table.is_empty());
    }
}

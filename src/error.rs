use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("could not resolve '{0}' to a FlyBase gene id (enter an FBgn or a canonical symbol)")]
    ResolutionFailed(String),

    #[error("'{0}' is not a gene record id; provide an FBgn id or a gene symbol")]
    UnsupportedIdentifierKind(String),

    #[error("invalid FlyBase gene id: {0} (example: FBgn0000099)")]
    InvalidIdentifier(String),

    #[error("unsupported organism: {0}")]
    UnsupportedOrganism(String),

    #[error("request to {endpoint} failed: {snippet}")]
    FetchFailed { endpoint: String, snippet: String },

    #[error("no orthologs returned: {0}")]
    EmptyResult(String),

    #[error("output folder does not exist: {0}")]
    OutputPathInvalid(Utf8PathBuf),

    #[error("could not write spreadsheet {path} (is it open in another program?): {message}")]
    WritePermission { path: Utf8PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl FetchError {
    /// Builds a `FetchFailed` from a response body, keeping only a short
    /// prefix so error messages stay readable.
    pub fn fetch_failed(endpoint: &str, body: &str) -> Self {
        const SNIPPET_LIMIT: usize = 300;
        let snippet = if body.len() > SNIPPET_LIMIT {
            let mut end = SNIPPET_LIMIT;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}…", &body[..end])
        } else {
            body.to_string()
        };
        FetchError::FetchFailed {
            endpoint: endpoint.to_string(),
            snippet,
        }
    }
}

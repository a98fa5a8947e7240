use std::time::Duration;

/// Explicit configuration handed to each HTTP client. There is no
/// process-global state; tests point `flybase_base_url` / `diopt_base_url`
/// at a local mock server.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub flybase_base_url: String,
    pub diopt_base_url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            flybase_base_url: "https://api.flybase.org/api/v1.0".to_string(),
            diopt_base_url: "https://www.flyrnai.org/cgi-bin/DRSC_orthologs.pl".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

pub fn user_agent() -> String {
    format!("flyfetch/{}", env!("CARGO_PKG_VERSION"))
}

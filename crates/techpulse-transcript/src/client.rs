//! HTTP client configuration shared by every network-bound method in the
//! fallback chain, mirroring `techpulse-sources`' client conventions.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::{Result, TranscriptError};

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self { timeout_secs: 30, connect_timeout_secs: 10 }
    }
}

pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .use_rustls_tls()
        .build()
        .map_err(|e| TranscriptError::Internal(format!("failed to create HTTP client: {e}")))
}

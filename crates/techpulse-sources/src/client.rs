//! Shared HTTP client utilities for upstream source adapters.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::{debug, warn};

use crate::error::{Result, SourceError};

/// HTTP client configuration. Defaults match §5's suspension-point budget:
/// a 30s per-call timeout for ordinary adapter requests.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 16,
            max_retries: 1,
            user_agent: format!("TechPulse/{} (+https://techpulse.example)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client with connection pooling. Unlike a
/// passthrough proxy, adapters consume and re-serialize upstream JSON/XML,
/// so response compression stays on.
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| SourceError::Config(format!("failed to create HTTP client: {e}")))
}

/// Classify a response's status (§4.1, §7): success passes through, a
/// 429 is logged with whatever `Retry-After` the upstream sent (informational
/// only — the adapter always backs off on the fixed 5s `with_retry` delay,
/// never the upstream-supplied one) and mapped to `RateLimited` so
/// `with_retry` retries it, anything else non-success becomes `Upstream`.
pub fn check_status(resp: &reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    if status.as_u16() == 429 {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(crate::retry_after::parse_retry_after);
        warn!(?retry_after_secs, "upstream signaled too-many-requests, retrying same page after 5s");
        return Err(SourceError::RateLimited { retry_after_secs });
    }
    Err(SourceError::Upstream { status: status.as_u16(), body: String::new() })
}

/// Retry a transient-failure-prone operation once per page with a fixed
/// 5s delay, per §7's "transient upstream" policy. `should_retry` decides
/// which errors are worth a retry (429/5xx/timeouts); anything else returns
/// immediately.
pub async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            debug!(attempt, max_retries, "retrying request after 5s delay");
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let should_retry = match &e {
                    SourceError::Http(req_err) => {
                        req_err.is_connect() || req_err.is_timeout() || req_err.is_request()
                    }
                    SourceError::Upstream { status, .. } => {
                        matches!(status, 429 | 500 | 502 | 503 | 504)
                    }
                    SourceError::RateLimited { .. } => true,
                    _ => false,
                };

                if should_retry && attempt < max_retries {
                    warn!(attempt = attempt + 1, max_retries, error = %e, "transient upstream failure");
                    last_error = Some(e);
                } else {
                    return Err(e);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| SourceError::Internal("retry loop exited unexpectedly".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_30s_timeout() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 1);
        assert!(config.user_agent.starts_with("TechPulse/"));
    }

    #[test]
    fn create_client_succeeds_with_default_config() {
        let config = HttpClientConfig::default();
        assert!(create_client(&config).is_ok());
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let result = with_retry(3, || async { Ok::<i32, SourceError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn check_status_maps_429_with_retry_after_to_rate_limited() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
            .mount(&server)
            .await;

        let client = create_client(&HttpClientConfig::default()).unwrap();
        let resp = client.get(server.uri()).send().await.unwrap();
        match check_status(&resp) {
            Err(SourceError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, Some(30)),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_status_maps_500_to_upstream() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(500)).mount(&server).await;

        let client = create_client(&HttpClientConfig::default()).unwrap();
        let resp = client.get(server.uri()).send().await.unwrap();
        match check_status(&resp) {
            Err(SourceError::Upstream { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retry_does_not_retry_non_transient_errors() {
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let result = with_retry(3, || {
            attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err::<i32, SourceError>(SourceError::Config("bad config".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

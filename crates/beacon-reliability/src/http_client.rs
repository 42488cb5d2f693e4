//! Reliable HTTP client: pooled `reqwest::Client` plus circuit breaker and
//! exponential-backoff retry, grounded on the teacher's
//! `HttpClientService`/`FetchOptions` but trimmed to what the relay pool
//! and federated search providers actually need (no robots.txt handling,
//! no bypass flag).

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Method, Response};
use tracing::{debug, warn};

use crate::circuit_breaker::{CircuitBreaker, Config as CircuitConfig};
use beacon_types::{BeaconError, Result};

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
            pool_max_idle_per_host: 10,
            user_agent: format!("beacon-search/{}", env!("CARGO_PKG_VERSION")),
            max_retries: 2,
            initial_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn add_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Wraps `reqwest::Client` with a named circuit breaker and bounded
/// exponential-backoff retry. One instance is shared per downstream
/// dependency (a relay, a web/media provider) so its breaker accumulates
/// state across calls.
pub struct ReliableHttpClient {
    client: Client,
    breaker: Arc<CircuitBreaker>,
    config: HttpConfig,
}

impl ReliableHttpClient {
    pub fn new(name: impl Into<String>, config: HttpConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| BeaconError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            breaker: CircuitBreaker::new(name, CircuitConfig::default()),
            config,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub async fn get(&self, url: &str, options: FetchOptions) -> Result<Response> {
        self.request(Method::GET, url, None, options).await
    }

    pub async fn post(&self, url: &str, body: Vec<u8>, options: FetchOptions) -> Result<Response> {
        self.request(Method::POST, url, Some(body), options).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        options: FetchOptions,
    ) -> Result<Response> {
        let timeout = options.timeout.unwrap_or(Duration::from_millis(self.config.timeout_ms));
        let mut backoff_ms = self.config.initial_backoff_ms;

        for attempt in 0..=self.config.max_retries {
            let permit = self.breaker.try_acquire().map_err(|reason| {
                BeaconError::TransientNetwork(format!("{} circuit breaker: {reason}", self.breaker.name()))
            })?;

            let mut builder = self.client.request(method.clone(), url).timeout(timeout);
            for (key, value) in &options.headers {
                builder = builder.header(key, value);
            }
            if let Some(ref body) = body {
                builder = builder.body(body.clone());
            }

            let outcome = builder.send().await;
            match outcome {
                Ok(response) if response.status().is_success() || response.status().is_redirection() => {
                    self.breaker.record_success();
                    drop(permit);
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status();
                    self.breaker.record_failure();
                    drop(permit);
                    if status.is_client_error() && status.as_u16() != 429 {
                        return Err(BeaconError::MalformedEvent(format!("HTTP {status} from {url}")));
                    }
                    if attempt == self.config.max_retries {
                        return Err(BeaconError::ProviderTimeout(timeout.as_millis() as u64));
                    }
                }
                Err(e) => {
                    self.breaker.record_failure();
                    drop(permit);
                    if attempt == self.config.max_retries {
                        return Err(BeaconError::TransientNetwork(e.to_string()));
                    }
                    warn!(url, attempt, error = %e, "HTTP request failed, retrying");
                }
            }

            debug!(url, attempt, backoff_ms, "retrying HTTP request");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms = (backoff_ms * 2).min(5_000);
        }

        Err(BeaconError::TransientNetwork(format!("exhausted retries for {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_timeouts() {
        let cfg = HttpConfig::default();
        assert_eq!(cfg.timeout_ms, 10_000);
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn client_construction_succeeds() {
        let client = ReliableHttpClient::new("test-provider", HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn fetch_options_builder_accumulates_headers() {
        let options = FetchOptions::default()
            .with_timeout(Duration::from_secs(5))
            .add_header("Authorization", "Bearer xyz");
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.headers.len(), 1);
    }
}

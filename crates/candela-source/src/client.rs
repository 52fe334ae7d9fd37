//! HTTP client for historical trade queries.

use std::time::Duration;

use bytes::Bytes;
use candela_types::RetryPolicy;
use reqwest::Client;
use tracing::{debug, warn};

use crate::TransportError;
use crate::url::KRAKEN_REST_URL;

/// Configuration for the REST client.
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// REST base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry budget for failed requests.
    pub retry: RetryPolicy,
    /// Pause between consecutive pages to stay under the public rate limit.
    pub page_delay: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            base_url: KRAKEN_REST_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default().with_max_retries(10),
            page_delay: Duration::from_millis(1000),
            user_agent: format!("candela/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RestClientConfig {
    /// Sets the REST base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the delay between pages.
    #[must_use]
    pub const fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }
}

/// HTTP client with connection pooling and retry logic.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    config: RestClientConfig,
}

impl RestClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: RestClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(RestClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Fetches a URL, returning the response body.
    ///
    /// Server errors (5xx), rate limiting (429) and transient connection
    /// failures are retried with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retries.
    pub async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let retry = self.config.retry;
        let mut attempts = 0;

        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        if retry.allows_retry(attempts) {
                            attempts += 1;
                            let delay = retry.backoff_delay(attempts);
                            warn!(%url, status = status.as_u16(), attempt = attempts, ?delay, "retrying request");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(TransportError::ServerError {
                            status: status.as_u16(),
                        });
                    }

                    response.error_for_status_ref()?;
                    let body = response.bytes().await?;
                    debug!(%url, bytes = body.len(), "fetched");
                    return Ok(body);
                }
                Err(e) if is_retryable_error(&e) && retry.allows_retry(attempts) => {
                    attempts += 1;
                    let delay = retry.backoff_delay(attempts);
                    warn!(%url, error = %e, attempt = attempts, ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Determines if an error is retryable.
fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_builder() {
        return false;
    }
    error.is_timeout() || error.is_connect() || error.is_request()
}

//! HTTP fetcher implementation
//!
//! This module handles the single outbound request of a lookup:
//! - Building a pooled HTTP client with bounded timeouts
//! - Browser-like request headers with a rotating user agent
//! - Retry with exponential backoff on transient failures
//! - Error classification into a terminal `FetchError`

use crate::config::RequestConfig;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Status codes retried before giving up
pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Terminal failure of a fetch; no image can be resolved for the page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid {name}: {value} seconds is not a representable duration")]
    InvalidDuration { name: &'static str, value: f64 },
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Page body content
    pub body: String,
}

/// Retrieves raw markup for a page URL
///
/// Implementations own connection reuse and retries; callers treat any
/// `Err` as terminal.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with pooling and timeouts from the configuration
///
/// The connect timeout bounds connection setup; the overall request
/// timeout is the connect and read budgets combined.
///
/// # Arguments
///
/// * `config` - The request configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(FetchError)` - A timeout does not fit a `Duration`, or the client failed to build
pub fn build_http_client(config: &RequestConfig) -> Result<Client, FetchError> {
    let connect = seconds("connect-timeout", config.connect_timeout_secs)?;
    let read = seconds("read-timeout", config.read_timeout_secs)?;
    let total = connect
        .checked_add(read)
        .ok_or(FetchError::InvalidDuration {
            name: "read-timeout",
            value: config.read_timeout_secs,
        })?;

    Client::builder()
        .connect_timeout(connect)
        .timeout(total)
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(FetchError::Client)
}

/// Converts configured seconds without panicking on negative, NaN or huge values
fn seconds(name: &'static str, value: f64) -> Result<Duration, FetchError> {
    Duration::try_from_secs_f64(value).map_err(|_| FetchError::InvalidDuration { name, value })
}

/// `Fetcher` backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agents: Vec<String>,
    max_retries: u32,
    backoff_factor: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the request configuration
    pub fn new(config: &RequestConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config)?;
        let user_agents = config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .collect();

        Ok(Self {
            client,
            user_agents,
            max_retries: config.max_retries,
            backoff_factor: seconds("backoff-factor", config.backoff_factor_secs)?,
        })
    }

    /// Headers sent with every request, with a randomly chosen user agent
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(ua) = self.user_agents.choose(&mut rand::thread_rng()) {
            if let Ok(value) = HeaderValue::from_str(ua) {
                headers.insert(USER_AGENT, value);
            }
        }

        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.amazon.com/"));
        headers.insert(
            "upgrade-insecure-requests",
            HeaderValue::from_static("1"),
        );

        headers
    }

    /// Delay before retry number `attempt` (1-based)
    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_factor
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// Fetches a URL with retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 500/502/503/504 | Retry up to `max_retries`, then `Status` |
    /// | Timeout | Retry up to `max_retries`, then `Timeout` |
    /// | Connection refused | Retry up to `max_retries`, then `Connect` |
    /// | Other non-2xx | Immediate `Status` |
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0u32;

        loop {
            let result = self
                .client
                .get(url)
                .headers(self.request_headers())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();

                    if RETRY_STATUSES.contains(&status.as_u16()) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::debug!(url, status = status.as_u16(), attempt, "Retrying after server error");
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(status_error(url, status));
                    }

                    let final_url = response.url().to_string();
                    let body = response.text().await.map_err(|e| classify_error(url, e))?;

                    return Ok(FetchedPage {
                        final_url,
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!(url, attempt, error = %e, "Retrying after network error");
                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                }
                Err(e) => return Err(classify_error(url, e)),
            }
        }
    }
}

fn status_error(url: &str, status: StatusCode) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    }
}

/// Maps a reqwest error onto the fetch taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

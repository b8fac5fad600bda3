//! OpenAlex HTTP client
//!
//! An explicitly constructed client that owns its transport configuration.
//! Callers build one [`OpenAlexClient`] per run and pass it to the fetcher.
//!
//! API Best Practices (per OpenAlex docs):
//! - Use `mailto:email` parameter for polite pool (10 req/s vs 1 req/s)
//! - Use `per-page=200` for maximum results per page
//! - Implement exponential backoff for retries

use crate::error::{OpenAlexError, Result};
use crate::work::{self, Record};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// OpenAlex API base URL
pub const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Statuses worth sending again: rate limiting and transient server errors
pub const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Transport configuration for [`OpenAlexClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Email for polite pool access
    pub mailto: Option<String>,
    /// User agent string
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries allowed for a single request after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on each further retry
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff
    pub max_backoff: Duration,
    /// HTTP statuses treated as transient
    pub retryable_statuses: Vec<u16>,
    /// Minimum spacing between consecutive requests on one client
    pub page_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: OPENALEX_API_BASE.to_string(),
            mailto: None,
            user_agent: format!("rustopenalex/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            max_retries: 5,
            initial_backoff: Duration::from_millis(300),
            max_backoff: Duration::from_secs(30),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
            page_delay: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Backoff before retry number `attempt` (0-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Builder for [`ClientConfig`]
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the API root
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Join the polite pool with this email
    pub fn mailto(mut self, email: impl Into<String>) -> Self {
        self.config.mailto = Some(email.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff bounds
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Replace the retryable status set
    pub fn retryable_statuses(mut self, statuses: &[u16]) -> Self {
        self.config.retryable_statuses = statuses.to_vec();
        self
    }

    /// Set the minimum spacing between requests
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.config.page_delay = delay;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// OpenAlex API client with bounded retry.
///
/// Every request sent through one client is spaced at least
/// [`ClientConfig::page_delay`] after the previous one, across fetches.
pub struct OpenAlexClient {
    http: Client,
    config: ClientConfig,
    last_request: Mutex<Option<Instant>>,
}

impl OpenAlexClient {
    /// Create a new client from an explicit configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            OpenAlexError::Config(format!("Invalid base URL {}: {}", config.base_url, e))
        })?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| OpenAlexError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            last_request: Mutex::new(None),
        })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET a JSON document, retrying transient failures with exponential backoff.
    ///
    /// `path` is joined to the base URL unless it is already absolute.
    pub async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.resolve(path)?;
        let mut retries = 0;

        loop {
            match self.send_once(&url, params).await {
                Ok(value) => return Ok(value),
                Err(e)
                    if retries < self.config.max_retries
                        && e.is_retryable(&self.config.retryable_statuses) =>
                {
                    let backoff = self.config.backoff_for(retries);
                    warn!(
                        url = %url,
                        attempt = retries + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Request failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                }
                Err(OpenAlexError::Api { code: 429, .. }) => {
                    return Err(OpenAlexError::RateLimited {
                        attempts: retries + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch a single work by short id (`W123`) or full OpenAlex URL.
    pub async fn get_work(&self, id: &str) -> Result<Record> {
        let short = work::short_id(id);
        if short.is_empty() {
            return Err(OpenAlexError::Validation(format!("Invalid work id: {:?}", id)));
        }

        match self.get_json(&format!("works/{}", short), &[]).await? {
            Value::Object(record) => Ok(record),
            other => Err(OpenAlexError::Parse(format!(
                "Expected a work object for {}, got {}",
                short,
                json_kind(&other)
            ))),
        }
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };

        Url::parse(&raw)
            .map_err(|e| OpenAlexError::Validation(format!("Invalid URL {}: {}", raw, e)))
    }

    /// Wait until `page_delay` has passed since the previous request.
    async fn throttle(&self) {
        let delay = self.config.page_delay;
        if delay.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                debug!(wait_ms = (delay - elapsed).as_millis() as u64, "Throttling request");
                tokio::time::sleep(delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn send_once(&self, url: &Url, params: &[(&str, String)]) -> Result<Value> {
        self.throttle().await;

        let mut request = self.http.get(url.clone()).query(params);
        if let Some(mailto) = &self.config.mailto {
            request = request.query(&[("mailto", mailto)]);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "OpenAlex response");

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OpenAlexError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| OpenAlexError::Parse(format!("Invalid JSON from {}: {}", url, e)))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

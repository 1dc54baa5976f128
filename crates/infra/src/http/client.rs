//! Retrying HTTP client
//!
//! Thin wrapper over `reqwest` that retries connect failures, timeouts and
//! 5xx responses of safe reads with doubling backoff. Writes go out once.
//! Other responses are returned as-is; interpreting the status is left to
//! the caller.

use std::time::Duration;

use rentkenya_common::BackoffStrategy;
use rentkenya_domain::constants::{DEFAULT_BACKEND_MAX_ATTEMPTS, DEFAULT_BACKEND_TIMEOUT_SECS};
use rentkenya_domain::{BackendConfig, RentalError, Result};
use reqwest::{Client, IntoUrl, Method, Request, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// What one attempt produced
enum Attempt {
    Done(Response),
    Retry(String),
    Failed(RentalError),
}

/// Shared `reqwest` client plus the read retry budget applied by [`HttpClient::send`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: usize,
    backoff: BackoffStrategy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client configured from the backend section of the app config.
    ///
    /// # Errors
    /// Returns `RentalError::Network` if the TLS backend cannot be initialised.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .max_attempts(config.max_attempts)
            .user_agent(concat!("rentkenya/", env!("CARGO_PKG_VERSION")))
            .build()
    }

    pub fn request(&self, method: Method, url: impl IntoUrl) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send `builder`, retrying transient failures of safe reads.
    ///
    /// Only `GET` and `HEAD` are replayed. Anything else gets one attempt,
    /// since a write that timed out may already have been applied. The
    /// final response is returned whatever its status once the budget is
    /// spent, so callers still see the backend's error body.
    ///
    /// # Errors
    /// Transport failures after the last attempt.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(InfraError::from)?;
        let budget = if is_replayable(request.method()) { self.max_attempts } else { 1 };
        self.execute(request, budget).await
    }

    /// Send `builder` exactly once, for callers that run their own retries.
    ///
    /// # Errors
    /// Transport failures.
    pub async fn send_once(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(InfraError::from)?;
        self.execute(request, 1).await
    }

    async fn execute(&self, request: Request, budget: usize) -> Result<Response> {
        for attempt in 1..budget {
            let Some(current) = request.try_clone() else {
                break;
            };
            match self.attempt(current, false).await {
                Attempt::Done(response) => return Ok(response),
                Attempt::Failed(err) => return Err(err),
                Attempt::Retry(reason) => {
                    let delay = self.backoff_delay(attempt);
                    debug!(attempt, ?delay, %reason, "retrying HTTP request");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        match self.attempt(request, true).await {
            Attempt::Done(response) => Ok(response),
            Attempt::Failed(err) => Err(err),
            Attempt::Retry(reason) => Err(RentalError::Network(reason)),
        }
    }

    /// Wait after the `attempt`-th try failed: base, then doubling.
    fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.calculate_delay(exponent)
    }

    async fn attempt(&self, request: Request, last: bool) -> Attempt {
        let method = request.method().clone();
        let url = request.url().clone();

        match self.client.execute(request).await {
            Ok(response) if response.status().is_server_error() && !last => {
                Attempt::Retry(format!("status {}", response.status()))
            }
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "HTTP response");
                Attempt::Done(response)
            }
            Err(err) if is_transient(&err) && !last => Attempt::Retry(err.to_string()),
            Err(err) => {
                warn!(%method, %url, error = %err, "HTTP request failed");
                Attempt::Failed(InfraError::from(err).into())
            }
        }
    }
}

fn is_replayable(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            max_attempts: DEFAULT_BACKEND_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts, first try included. Clamped to at least one.
    #[must_use]
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; each further retry doubles it.
    #[must_use]
    pub const fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// Returns an error if `reqwest` cannot build the client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = Client::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(InfraError::from)?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            backoff: BackoffStrategy::doubling(self.base_backoff, MAX_BACKOFF),
        })
    }
}

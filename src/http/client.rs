use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use super::RateLimiter;

/// How many times a transient failure is retried and how long to wait first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each one
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Failures surfaced by [`RateLimitedClient`]
#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    #[error("request cancelled")]
    Cancelled,

    #[error("transport failure after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("rate limited by upstream after {attempts} attempts (status {status})")]
    RateLimited {
        attempts: u32,
        status: StatusCode,
        body: String,
    },

    #[error("upstream server error after {attempts} attempts (status {status}): {body}")]
    Server {
        attempts: u32,
        status: StatusCode,
        body: String,
    },

    #[error("failed to build request: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request body cannot be replayed for retry")]
    NotReplayable,
}

impl HttpError {
    /// True for failures that were retried and may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::Transport { .. } | HttpError::RateLimited { .. } | HttpError::Server { .. }
        )
    }
}

fn is_retryable_server_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// HTTP client that paces requests through a [`RateLimiter`] and retries
/// transient failures with exponential backoff
///
/// Cheap to clone; clones share the connection pool and the limiter.
#[derive(Clone)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl RateLimitedClient {
    /// Builds a client with a per-attempt `timeout` and a limit of
    /// `requests_per_second`
    pub fn new(
        timeout: Duration,
        requests_per_second: u32,
        policy: RetryPolicy,
    ) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(HttpError::Build)?;

        Ok(Self {
            http,
            limiter: Arc::new(RateLimiter::new(requests_per_second)),
            policy,
        })
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Sends a GET with the given query parameters
    pub async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<Response, HttpError> {
        let request = self
            .http
            .get(url)
            .query(query)
            .build()
            .map_err(HttpError::Build)?;

        self.execute(request, cancel).await
    }

    /// Sends `request`, retrying transport errors, 429 and 5xx gateway statuses
    ///
    /// Any other status is returned to the caller untouched. Each attempt waits
    /// for its own permit. A 429 waits twice the current backoff.
    pub async fn execute(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<Response, HttpError> {
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let attempt_request = request.try_clone().ok_or(HttpError::NotReplayable)?;

            self.limiter.acquire(cancel).await?;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HttpError::Cancelled),
                result = self.http.execute(attempt_request) => result,
            };

            let exhausted = attempt > self.policy.max_retries;

            let delay = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if exhausted {
                            return Err(HttpError::RateLimited {
                                attempts: attempt,
                                status,
                                body: response.text().await.unwrap_or_default(),
                            });
                        }
                        backoff.saturating_mul(2)
                    } else if is_retryable_server_status(status) {
                        if exhausted {
                            return Err(HttpError::Server {
                                attempts: attempt,
                                status,
                                body: response.text().await.unwrap_or_default(),
                            });
                        }
                        backoff
                    } else {
                        return Ok(response);
                    }
                }
                Err(source) => {
                    let source = source.without_url();
                    if exhausted {
                        return Err(HttpError::Transport {
                            attempts: attempt,
                            source,
                        });
                    }
                    tracing::debug!(error = %source, attempt, "Transport error");
                    backoff
                }
            };

            tracing::warn!(
                path = %request.url().path(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying upstream request"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HttpError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            backoff = backoff.saturating_mul(2);
        }
    }
}

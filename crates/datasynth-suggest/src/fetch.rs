//! HTTP client for knowledge-base calls with retry, backoff, and error
//! classification.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// Failure of an outbound knowledge-base request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 403, 429 or 5xx that persisted through every retry.
    #[error("transient upstream failure ({status}) for {url} after {attempts} attempts")]
    Transient {
        status: u16,
        url: String,
        attempts: u32,
    },
    /// Any other error status; never retried.
    #[error("upstream rejected request ({status}) for {url}")]
    Permanent { status: u16, url: String },
    /// Connection or timeout failure; never retried.
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("unexpected response body from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid url {url}")]
    InvalidUrl { url: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

impl FetchError {
    /// True for retryable statuses that outlasted the retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Returns true for statuses worth retrying: 403, 429 and every 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    status == 403 || status == 429 || (500..600).contains(&status)
}

/// Exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(600),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Blocking JSON client used for one suggestion call.
///
/// Every request carries the configured `User-Agent`; the upstream usage
/// policy throttles or blocks anonymous clients.
pub struct FetchClient {
    http: Client,
    policy: RetryPolicy,
    sleep: Sleeper,
}

impl FetchClient {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        let http = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        Ok(Self {
            http,
            policy: RetryPolicy::default(),
            sleep: Arc::new(thread::sleep),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the function used to wait between attempts.
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Arc::new(sleep);
        self
    }

    pub fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, FetchError> {
        self.request(Method::GET, url, params)
    }

    /// Send a request and parse the JSON body, retrying transient statuses.
    /// Transport failures return at once so the caller can switch surfaces.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, FetchError> {
        let mut attempt = 0_u32;

        loop {
            let result = self
                .http
                .request(method.clone(), url)
                .query(params)
                .send();

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        debug!(url, status, attempt, "knowledge-base request succeeded");
                        return response.json::<Value>().map_err(|err| FetchError::Decode {
                            url: url.to_string(),
                            message: err.to_string(),
                        });
                    }
                    if !is_retryable_status(status) {
                        return Err(FetchError::Permanent {
                            status,
                            url: url.to_string(),
                        });
                    }
                    if attempt >= self.policy.max_retries {
                        return Err(FetchError::Transient {
                            status,
                            url: url.to_string(),
                            attempts: attempt + 1,
                        });
                    }
                    warn!(
                        url,
                        status,
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = self.policy.delay_for(attempt).as_millis() as u64,
                        "retrying knowledge-base request"
                    );
                }
                Err(err) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        message: err.to_string(),
                    });
                }
            }

            (self.sleep)(self.policy.delay_for(attempt));
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(600));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2400));
    }

    #[test]
    fn retryable_status_classes() {
        assert!(is_retryable_status(403));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
    }

    #[test]
    fn transient_classification() {
        let transient = FetchError::Transient {
            status: 429,
            url: "u".to_string(),
            attempts: 4,
        };
        let permanent = FetchError::Permanent {
            status: 404,
            url: "u".to_string(),
        };
        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
    }
}

//! Shared HTTP client with an explicit retry policy.
//!
//! Every request gets a fixed timeout. Retryable failures (configured 5xx
//! statuses, connect errors and timeouts) are retried with exponential backoff
//! up to `max_retries` times. A 413, 429 or 503 carrying a `Retry-After`
//! header is also retried, after the delay the server asked for. Everything
//! else fails on the first attempt.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{LagError, Result};

/// Statuses whose `Retry-After` header is honored
const RETRY_AFTER_STATUSES: [StatusCode; 3] = [
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Retry schedule applied at the network boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub backoff_base: Duration,
    /// Upper bound for a single backoff (and for a server-requested Retry-After)
    pub backoff_max: Duration,
    /// Statuses worth another attempt
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(120),
            retry_statuses: vec![500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            retry_statuses: config.retry_statuses.clone(),
        }
    }

    /// Upper bound on requests issued for one call
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Delay before the next attempt: a server-requested `retry_after` capped at
    /// `backoff_max`, otherwise the backoff schedule for `retry`
    pub fn retry_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|d| d.min(self.backoff_max))
            .unwrap_or_else(|| self.backoff_duration(retry))
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// The first retry is immediate, then `base * 2^(retry - 1)`, capped at `backoff_max`.
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    /// Worst-case time spent sleeping between attempts
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_retries)
            .map(|retry| self.backoff_duration(retry))
            .sum()
    }
}

/// HTTP client shared by all fetchers
#[derive(Clone)]
pub struct RetryingHttpClient {
    http: Client,
    policy: RetryPolicy,
}

impl RetryingHttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| LagError::Validation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            policy: RetryPolicy::from_config(config),
        })
    }

    /// GET `url` with `query` and decode the JSON body, retrying per policy
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut retry: u32 = 0;

        loop {
            debug!(url, attempt = retry + 1, "GET");

            let (failure, retry_after) = match self.http.get(url).query(query).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let text = resp.text().await?;
                        return serde_json::from_str(&text).map_err(LagError::from);
                    }
                    let retry_after = if RETRY_AFTER_STATUSES.contains(&status) {
                        parse_retry_after(resp.headers().get(RETRY_AFTER))
                    } else {
                        None
                    };
                    if retry_after.is_none() && !self.policy.is_retryable_status(status) {
                        return Err(LagError::HttpStatus {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    (format!("HTTP {}", status.as_u16()), retry_after)
                }
                Err(e) if e.is_timeout() || e.is_connect() => (e.to_string(), None),
                Err(e) => return Err(LagError::Http(e)),
            };

            if retry >= self.policy.max_retries {
                return Err(LagError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: retry + 1,
                    last: failure,
                });
            }

            retry += 1;
            let delay = self.policy.retry_delay(retry, retry_after);

            warn!(
                url,
                retry,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Request failed ({}), retrying",
                failure
            );

            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }
}

/// Retry-After in delta-seconds form; HTTP-date values are ignored
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_duration(1), Duration::ZERO);
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_duration(4), Duration::from_secs(8));
        assert_eq!(policy.backoff_duration(5), Duration::from_secs(16));
        assert_eq!(policy.backoff_duration(8), Duration::from_secs(120)); // capped
        assert_eq!(policy.backoff_duration(64), Duration::from_secs(120));
        assert_eq!(policy.total_backoff(), Duration::from_secs(30));
        assert_eq!(policy.max_attempts(), 6);
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        for code in [500u16, 502, 503, 504] {
            assert!(policy.is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        for code in [400u16, 401, 404, 429, 501] {
            assert!(!policy.is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
    }

    #[test]
    fn test_retry_after_overrides_backoff_up_to_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_delay(1, None), Duration::ZERO);
        assert_eq!(policy.retry_delay(3, None), Duration::from_secs(4));
        assert_eq!(
            policy.retry_delay(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            policy.retry_delay(2, Some(Duration::from_secs(600))),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = crate::config::AppConfig::default().http;
        assert_eq!(RetryPolicy::from_config(&config), RetryPolicy::default());
    }

    #[test]
    fn test_parse_retry_after() {
        let secs = HeaderValue::from_static("7");
        assert_eq!(parse_retry_after(Some(&secs)), Some(Duration::from_secs(7)));

        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }
}

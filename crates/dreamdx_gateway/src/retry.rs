//! Exponential backoff for calls to the narrative endpoint.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_setters::Setters;
use dreamdx_error::{GatewayError, GatewayResult};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Retry configuration for endpoint calls.
///
/// The delay before retry `n` is zero for the first retry and
/// `backoff_factor * 2^(n-1)` seconds afterwards, never more than
/// `max_backoff`.
///
/// # Examples
///
/// ```
/// use dreamdx_gateway::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.backoff_for(1), Duration::ZERO);
/// assert_eq!(policy.backoff_for(2), Duration::from_millis(600));
/// assert_eq!(policy.backoff_for(3), Duration::from_millis(1200));
/// ```
#[derive(Debug, Clone, PartialEq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    max_retries: u32,
    /// Backoff factor in seconds.
    backoff_factor: f64,
    /// Upper bound of any single delay.
    max_backoff: Duration,
    /// Honour `Retry-After` on retryable responses.
    respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.3,
            max_backoff: Duration::from_secs(120),
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_millis((secs.max(0.0) * 1000.0).round() as u64)
    }

    fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) if self.respect_retry_after => hint.min(self.max_backoff),
            _ => self.backoff_for(retry),
        }
    }
}

/// Parses a `Retry-After` value given as delay seconds or as an HTTP-date.
///
/// A date in the past yields a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// A failed attempt plus the server's `Retry-After` hint, if it sent one.
#[derive(Debug)]
pub struct AttemptError {
    /// The failure
    pub error: GatewayError,
    /// Parsed `Retry-After` header
    pub retry_after: Option<Duration>,
    /// Stop here even if the failure kind is retryable
    pub fatal: bool,
}

impl AttemptError {
    /// Marks the failure as final.
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    fn is_retryable(&self) -> bool {
        !self.fatal && self.error.kind.is_retryable()
    }
}

impl From<GatewayError> for AttemptError {
    fn from(error: GatewayError) -> Self {
        Self {
            error,
            retry_after: None,
            fatal: false,
        }
    }
}

/// Retries an operation with exponential backoff.
///
/// Non-retryable failures return immediately; once retries are exhausted the
/// last failure is returned.
#[instrument(skip(operation))]
pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> GatewayResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AttemptError>>,
{
    let mut retry = 0;

    loop {
        debug!(attempt = retry + 1, "Executing request");

        match operation().await {
            Ok(result) => {
                if retry > 0 {
                    debug!(retries = retry, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(failure) => {
                let retryable = failure.is_retryable();
                let AttemptError {
                    error, retry_after, ..
                } = failure;
                if !retryable {
                    debug!(error = %error.kind, "Error is not retryable, failing immediately");
                    return Err(error);
                }
                if retry >= policy.max_retries {
                    warn!(attempts = retry + 1, error = %error.kind, "All retry attempts exhausted");
                    return Err(error);
                }

                retry += 1;
                let delay = policy.delay_for(retry, retry_after);
                warn!(
                    retry,
                    delay_ms = delay.as_millis() as u64,
                    error = %error.kind,
                    "Retrying after failure"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamdx_error::GatewayErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> AttemptError {
        GatewayError::new(GatewayErrorKind::ServerStatus {
            status: 503,
            message: "busy".to_string(),
        })
        .into()
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default().with_max_backoff(Duration::from_secs(1));
        assert_eq!(policy.backoff_for(10), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(200), Duration::from_secs(1));
    }

    #[test]
    fn test_retry_after_overrides_but_is_capped() {
        let policy = RetryPolicy::default().with_max_backoff(Duration::from_secs(5));
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(60))),
            Duration::from_secs(5)
        );
        let ignoring = policy.with_respect_retry_after(false);
        assert_eq!(ignoring.delay_for(1, Some(Duration::from_secs(2))), Duration::ZERO);
    }

    #[test]
    fn test_retry_after_forms() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_retry_after(" 3 ", now), Some(Duration::from_secs(3)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::default().with_backoff_factor(0.0);

        let result: GatewayResult<()> = retry_with_backoff(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind.status(), Some(503));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: GatewayResult<()> = retry_with_backoff(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(GatewayError::new(GatewayErrorKind::ClientStatus {
                    status: 404,
                    message: "Session not found.".to_string(),
                })
                .into())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_attempt_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: GatewayResult<()> = retry_with_backoff(&RetryPolicy::default(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable().fatal()) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind.status(), Some(503));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}

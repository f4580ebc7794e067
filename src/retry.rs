use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Outcome of a failed call to a device or provisioning API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Worth another attempt: timeouts, refused connections, 5xx, 429.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The request itself is wrong or the answer is unusable.
    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl CallError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transient(_))
    }

    /// Classify an HTTP status that was not a success.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let msg = format!("HTTP {}: {}", status.as_u16(), body.trim());
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            CallError::Transient(msg)
        } else {
            CallError::Fatal(msg)
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            CallError::Transient(e.to_string())
        } else if let Some(status) = e.status() {
            CallError::from_status(status, &e.to_string())
        } else {
            CallError::Fatal(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): doubling, capped, with
    /// up to 25% random jitter on top.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX));
        let capped = exp.min(self.max_delay);
        let jitter_ms = capped.as_millis() as u64 / 4;
        if jitter_ms == 0 {
            return capped;
        }
        capped + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Run `op` until it succeeds, fails fatally, or the policy runs out of attempts.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{} attempt {}/{} failed: {} (retrying in {:?})",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!("{} failed after {} attempts: {}", label, attempts, e);
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_retries_transient_until_success() {
        let calls = Cell::new(0);
        let result = tokio_test::block_on(retry(&quick(), "probe", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(CallError::Transient("connection refused".into()))
                } else {
                    Ok(n)
                }
            }
        }));
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_fatal_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = tokio_test::block_on(retry(&quick(), "probe", || {
            calls.set(calls.get() + 1);
            async { Err(CallError::Fatal("HTTP 401: unauthorized".into())) }
        }));
        assert_eq!(result, Err(CallError::Fatal("HTTP 401: unauthorized".into())));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = tokio_test::block_on(retry(&quick(), "probe", || {
            calls.set(calls.get() + 1);
            async { Err(CallError::Transient("timed out".into())) }
        }));
        assert!(matches!(result, Err(CallError::Transient(_))));
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        let first = policy.delay_for(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        let second = policy.delay_for(2);
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(250));
        let capped = policy.delay_for(10);
        assert!(capped >= Duration::from_millis(350) && capped <= Duration::from_millis(437));
    }

    #[test]
    fn test_status_classification() {
        use reqwest::StatusCode;
        assert!(CallError::from_status(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(CallError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(!CallError::from_status(StatusCode::UNAUTHORIZED, "").is_transient());
        assert!(!CallError::from_status(StatusCode::NOT_FOUND, "").is_transient());
    }
}

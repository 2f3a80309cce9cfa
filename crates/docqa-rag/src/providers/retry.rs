//! Bounded retries with exponential backoff for upstream calls

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::error::Result;

/// Retry policy shared by every upstream client
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    /// No retries at all
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently or retries run out
    pub async fn run<F, Fut, T>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn throttled() -> Error {
        Error::Upstream {
            service: "gemini",
            status: 429,
            body: "quota".to_string(),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));
        let calls = &AtomicU32::new(0);

        let result = policy
            .run("flaky call", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(throttled())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));
        let calls = &AtomicU32::new(0);

        let result: Result<()> = policy
            .run("bad key", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::MissingCredentials("gemini".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1));
        let calls = &AtomicU32::new(0);

        let result: Result<()> = policy
            .run("outage", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(throttled())
            })
            .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

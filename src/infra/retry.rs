//! Retry with exponential backoff and jitter for external anchor calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use super::{LedgerError, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts (0 = only the initial attempt)
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on the exponentially-growing delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Jitter factor in `[0.0, 1.0]`; the delay is scaled by a random factor
    /// in `[1 - jitter/2, 1 + jitter/2]`
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::external_service()
    }
}

impl RetryConfig {
    /// Policy for calls to the external timestamping authority.
    pub fn external_service() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }

    /// Fast policy for tests and in-memory operations.
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = 1.0 - self.jitter / 2.0 + rand::thread_rng().gen::<f64>() * self.jitter;
        delay.mul_f64(factor)
    }
}

/// Run `operation`, retrying transient failures per `config`.
///
/// Only errors for which [`LedgerError::is_transient`] holds are retried;
/// everything else propagates immediately.
pub async fn retry<T, F, Fut>(config: &RetryConfig, what: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = config.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                let sleep_for = config.jittered(delay);
                warn!(
                    operation = what,
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = sleep_for.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(sleep_for).await;
                delay = delay.mul_f64(config.multiplier).min(config.max_delay);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let result = retry(&RetryConfig::fast(), "noop", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, LedgerError>(42) }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry(&RetryConfig::fast(), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LedgerError::AnchorUnavailable("down".into()))
                } else {
                    Ok("up")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "up");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(&RetryConfig::fast(), "dead", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::AnchorUnavailable("still down".into())) }
        })
        .await;

        assert!(matches!(result, Err(LedgerError::AnchorUnavailable(_))));
        // initial attempt + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(&RetryConfig::fast(), "fatal", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::Internal("broken".into())) }
        })
        .await;

        assert!(matches!(result, Err(LedgerError::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Fail-open wrapper for optional external checks.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Runs a fallible check with a timeout and a declared fallback.
///
/// Errors and timeouts are logged and replaced by `default_on_failure`; they
/// never propagate to the caller.
#[derive(Debug, Clone)]
pub struct BestEffortCheck<T> {
    default_on_failure: T,
    timeout: Duration,
}

impl<T: Clone> BestEffortCheck<T> {
    /// Create a check that yields `default_on_failure` when the lookup fails.
    #[must_use]
    pub fn new(default_on_failure: T, timeout: Duration) -> Self {
        Self {
            default_on_failure,
            timeout,
        }
    }

    /// Await `lookup` within the time budget.
    pub async fn run<F, E>(&self, label: &str, lookup: F) -> T
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                tracing::warn!(
                    check = %label,
                    error = %e,
                    "Best-effort check failed - continuing with default"
                );
                self.default_on_failure.clone()
            }
            Err(_) => {
                tracing::warn!(
                    check = %label,
                    timeout_ms = %self.timeout.as_millis(),
                    "Best-effort check timed out - continuing with default"
                );
                self.default_on_failure.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_lookup_value() {
        let check = BestEffortCheck::new(false, Duration::from_secs(1));
        let value = check.run("test", async { Ok::<_, String>(true) }).await;
        assert!(value);
    }

    #[tokio::test]
    async fn error_yields_default() {
        let check = BestEffortCheck::new(false, Duration::from_secs(1));
        let value = check
            .run("test", async { Err::<bool, _>("connection refused") })
            .await;
        assert!(!value);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_default() {
        let check = BestEffortCheck::new(7_u32, Duration::from_millis(50));
        let value = check
            .run("test", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(1)
            })
            .await;
        assert_eq!(value, 7);
    }
}

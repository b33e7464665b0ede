//! Retry with exponential back-off, plus one-shot schema self-healing.
//!
//! Transient errors (timeouts, deadlocks, lost connections) are retried up to
//! `max_retries` times. A missing-structure error triggers a single
//! [`SupplierStore::bootstrap`] followed by one more attempt that does not
//! consume the back-off budget. Everything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;
use crate::store::SupplierStore;

const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`.
    ///
    /// | Attempt | Sleep (base 1 s) |
    /// |---------|------------------|
    /// | 0       | 1 s              |
    /// | 1       | 2 s              |
    /// | 2       | 4 s              |
    ///
    /// Capped at 60 s.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << attempt.min(10))
            .min(MAX_DELAY)
    }
}

/// Outcome of a guarded operation together with what it took to get there.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, StoreError>,
    pub retries: u32,
    pub healed: bool,
}

/// Runs `operation` against `store` under `policy`.
pub async fn run_with_recovery<S, T, F, Fut>(
    store: &S,
    policy: RetryPolicy,
    operation_name: &'static str,
    mut operation: F,
) -> Attempted<T>
where
    S: SupplierStore + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut retries = 0u32;
    let mut healed = false;
    loop {
        match operation().await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    retries,
                    healed,
                }
            }
            Err(err) if err.is_missing_structure() && !healed => {
                healed = true;
                tracing::warn!(
                    operation = operation_name,
                    error = %err,
                    "schema object missing; bootstrapping and retrying once"
                );
                if let Err(bootstrap_err) = store.bootstrap().await {
                    tracing::warn!(
                        operation = operation_name,
                        error = %bootstrap_err,
                        "schema bootstrap failed"
                    );
                    return Attempted {
                        result: Err(bootstrap_err),
                        retries,
                        healed,
                    };
                }
            }
            Err(err) if err.is_transient() && retries < policy.max_retries => {
                let delay = policy.delay_for(retries);
                retries += 1;
                tracing::warn!(
                    operation = operation_name,
                    attempt = retries,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient store error; retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Attempted {
                    result: Err(err),
                    retries,
                    healed,
                }
            }
        }
    }
}

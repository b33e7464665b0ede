//! Circuit breaker guarding the store.
//!
//! ```text
//! Closed --(threshold consecutive failures)--> Open
//! Open   --(cooldown elapsed, next call)-----> HalfOpen
//! HalfOpen --success--> Closed
//! HalfOpen --failure--> Open
//! ```
//!
//! While open, calls fail fast with [`StoreError::CircuitOpen`] and never
//! reach the store.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    times_opened: u64,
    total_failures: u64,
    total_successes: u64,
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub threshold: u32,
    pub cooldown_secs: u64,
    pub times_opened: u64,
    pub total_failures: u64,
    pub total_successes: u64,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    inner: RwLock<BreakerInner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            inner: RwLock::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                times_opened: 0,
                total_failures: 0,
                total_successes: 0,
            }),
        }
    }

    /// Admit or reject a call. An open breaker whose cooldown has elapsed
    /// moves to half-open and admits the call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CircuitOpen`] while the cooldown is running.
    pub async fn check(&self) -> Result<(), StoreError> {
        {
            let inner = self.inner.read().await;
            if inner.state != CircuitState::Open {
                return Ok(());
            }
        }

        let mut inner = self.inner.write().await;
        if inner.state != CircuitState::Open {
            return Ok(());
        }
        let elapsed = inner.opened_at.map_or(self.cooldown, |at| at.elapsed());
        if elapsed >= self.cooldown {
            inner.state = CircuitState::HalfOpen;
            tracing::info!("circuit breaker half-open; admitting trial call");
            return Ok(());
        }

        let remaining = self.cooldown.saturating_sub(elapsed);
        Err(StoreError::CircuitOpen {
            retry_after_secs: remaining.as_secs().max(1),
        })
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        inner.total_successes += 1;
        inner.consecutive_failures = 0;
        if inner.state != CircuitState::Closed {
            tracing::info!(previous = ?inner.state, "circuit breaker closed");
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
        }
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.total_failures += 1;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.threshold,
            CircuitState::Open => false,
        };
        if trip {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.times_opened += 1;
            tracing::warn!(
                consecutive_failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.read().await;
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            threshold: self.threshold,
            cooldown_secs: self.cooldown.as_secs(),
            times_opened: inner.times_opened,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
        }
    }
}

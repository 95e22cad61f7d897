//! Delay - Injectable Waiting
//!
//! The establisher never calls `tokio::time::sleep` directly; it waits
//! through a [`Delay`] so the retry loop can run against simulated time.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::clock::SimClock;

/// Something that can wait for a duration.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real waiting on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Simulated waiting: advances a [`SimClock`] and returns immediately.
///
/// Clones share the same clock and sleep log.
#[derive(Debug, Clone, Default)]
pub struct SimDelay {
    clock: Arc<Mutex<SimClock>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl SimDelay {
    /// Create a delay over a fresh clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now_ms()
    }

    /// Every duration slept so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Delay for SimDelay {
    async fn sleep(&self, duration: Duration) {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(duration);
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

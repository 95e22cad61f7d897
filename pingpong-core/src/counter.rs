//! Counter Core
//!
//! TigerStyle: one owned struct, one lock, no ambient state.
//!
//! The lock is the single authority for ordering. Increments take the write
//! side for the whole read-modify-write-read-back span; peeks and pings take
//! the read side, so they may overlap each other but never an increment.
//! Every backend call is bounded by a timeout and a timed-out call is
//! reported as `BackendUnavailable`.
//!
//! An increment runs in its own task that owns the write guard. A timeout
//! detaches the caller, not the mutation: the lock stays held until the
//! backend finishes, so no later increment or peek can interleave with it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::constants::BACKEND_TIMEOUT_MS_DEFAULT;
use crate::storage::{CounterBackend, StorageError, StorageResult};

/// Per-request counter failures.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The backend failed or timed out. Callers retry; the counter does not.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[from] StorageError),

    /// The backend reported a post-increment value that cannot follow an increment.
    #[error("backend returned impossible post-increment value {value}")]
    Inconsistent {
        /// Value returned by the backend
        value: u64,
    },
}

/// The single logical counter.
pub struct Counter {
    backend: Arc<RwLock<Arc<dyn CounterBackend>>>,
    timeout: Duration,
}

impl Counter {
    /// Wrap an established backend with the default timeout.
    #[must_use]
    pub fn new(backend: Box<dyn CounterBackend>) -> Self {
        Self {
            backend: Arc::new(RwLock::new(Arc::from(backend))),
            timeout: Duration::from_millis(BACKEND_TIMEOUT_MS_DEFAULT),
        }
    }

    /// Override the per-operation timeout.
    ///
    /// # Panics
    /// Panics if the timeout is zero.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "backend timeout must be positive");
        self.timeout = timeout;
        self
    }

    /// Increment and return the PRE-increment value.
    ///
    /// The Nth successful call on a fresh counter returns N-1.
    ///
    /// # Errors
    /// `BackendUnavailable` if the write fails or times out; the committed
    /// value is then whatever the backend holds, never advanced locally. A
    /// timed-out write may still commit; the next increment waits for it.
    pub async fn increment_and_get(&self) -> Result<u64, CounterError> {
        let lock = Arc::clone(&self.backend);
        let next = self
            .bounded("increment", async move {
                let backend = lock.write_owned().await;
                let task = tokio::spawn(async move {
                    let result = backend.increment_and_return().await;
                    if let Err(e) = &result {
                        tracing::debug!(error = %e, "increment task finished with error");
                    }
                    drop(backend);
                    result
                });
                task.await.unwrap_or_else(|e| {
                    Err(StorageError::internal(format!("increment task failed: {e}")))
                })
            })
            .await?;

        let previous = next
            .checked_sub(1)
            .ok_or(CounterError::Inconsistent { value: next })?;
        tracing::debug!(previous, next, "counter incremented");
        Ok(previous)
    }

    /// Current committed value, without mutating it.
    ///
    /// # Errors
    /// `BackendUnavailable` if the read fails or times out.
    pub async fn peek(&self) -> Result<u64, CounterError> {
        let value = self
            .bounded("read", async {
                let backend = self.backend.read().await;
                backend.read().await
            })
            .await?;
        tracing::debug!(value, "counter peeked");
        Ok(value)
    }

    /// Backend liveness probe.
    ///
    /// # Errors
    /// `BackendUnavailable` if the ping fails or times out.
    pub async fn ping(&self) -> Result<(), CounterError> {
        self.bounded("ping", async {
            let backend = self.backend.read().await;
            backend.ping().await
        })
        .await
    }

    /// Release the backend. Waits up to the timeout for in-flight operations.
    pub async fn close(&self) {
        match tokio::time::timeout(self.timeout, self.backend.write()).await {
            Ok(backend) => {
                tracing::info!(backend = backend.kind(), "closing counter backend");
                backend.close().await;
            }
            Err(_) => {
                tracing::warn!("backend still busy at close, releasing without waiting");
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = StorageResult<T>>,
    ) -> Result<T, CounterError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(operation, error = %e, "counter backend operation failed");
                Err(CounterError::BackendUnavailable(e))
            }
            Err(_) => {
                let ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::error!(operation, timeout_ms = ms, "counter backend operation timed out");
                Err(CounterError::BackendUnavailable(StorageError::Timeout {
                    operation,
                    ms,
                }))
            }
        }
    }
}

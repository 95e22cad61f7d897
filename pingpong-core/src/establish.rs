//! Connection Establisher
//!
//! TigerStyle: bounded retries, fixed delay, fatal on exhaustion.
//!
//! ```text
//! attempt 1..=R:  connect ──fail──▶ log, wait D ──▶ next attempt
//!                    │
//!                  ping ──fail──▶ close, log, wait D ──▶ next attempt
//!                    │
//!              ensure_schema ──fail──▶ EstablishError::Schema (fatal)
//!                    │
//!           ensure_initialized ──fail──▶ EstablishError::Schema (fatal)
//!                    │
//!                  ready
//! ```
//!
//! After R failed attempts the establisher returns
//! [`EstablishError::ConnectionExhausted`]; the caller must not serve.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::constants::{CONNECT_ATTEMPTS_DEFAULT, CONNECT_ATTEMPTS_MAX, CONNECT_RETRY_DELAY_MS_DEFAULT};
use crate::dst::Delay;
use crate::storage::{CounterBackend, SeedOutcome, StorageError, StorageResult};

// =============================================================================
// Connector
// =============================================================================

/// Opens a backend. One call is one attempt; the establisher owns retrying.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Backend produced on success.
    type Backend: CounterBackend + 'static;

    /// Human-readable description of what is being connected to.
    fn target(&self) -> String;

    /// Try once to open the backend.
    async fn connect(&self, attempt: u32) -> StorageResult<Self::Backend>;
}

// =============================================================================
// Retry Policy
// =============================================================================

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts_max: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// # Panics
    /// Panics if `attempts_max` is 0 or above `CONNECT_ATTEMPTS_MAX`.
    #[must_use]
    pub fn new(attempts_max: u32, delay: Duration) -> Self {
        assert!(attempts_max > 0, "retry policy needs at least one attempt");
        assert!(
            attempts_max <= CONNECT_ATTEMPTS_MAX,
            "attempts {attempts_max} exceeds max {CONNECT_ATTEMPTS_MAX}"
        );
        Self {
            attempts_max,
            delay,
        }
    }

    /// Maximum number of attempts.
    #[must_use]
    pub fn attempts_max(&self) -> u32 {
        self.attempts_max
    }

    /// Wait between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            CONNECT_ATTEMPTS_DEFAULT,
            Duration::from_millis(CONNECT_RETRY_DELAY_MS_DEFAULT),
        )
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum EstablishError {
    /// Every attempt failed.
    #[error("backend unreachable after {attempts} attempts: {last_error}")]
    ConnectionExhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last_error: StorageError,
    },

    /// Connected, but could not create the table/file or seed the counter.
    #[error("failed to prepare counter storage: {0}")]
    Schema(StorageError),
}

// =============================================================================
// Establish
// =============================================================================

/// Connect under `policy`, then ensure schema and initial value.
///
/// # Errors
/// [`EstablishError::ConnectionExhausted`] if no attempt connects and pings;
/// [`EstablishError::Schema`] if preparation fails after a good ping.
pub async fn establish<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
    delay: &dyn Delay,
) -> Result<Box<dyn CounterBackend>, EstablishError> {
    let target = connector.target();
    tracing::info!(%target, attempts_max = policy.attempts_max, "connecting to counter backend");

    let backend = connect_with_retry(connector, policy, delay, &target).await?;

    match prepare(&backend).await {
        Ok(SeedOutcome::Created) => tracing::info!("initialized counter to 0"),
        Ok(SeedOutcome::Existing(value)) => {
            tracing::info!(value, "found existing counter value");
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to prepare counter storage");
            backend.close().await;
            return Err(EstablishError::Schema(e));
        }
    }

    Ok(Box::new(backend))
}

async fn connect_with_retry<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
    delay: &dyn Delay,
    target: &str,
) -> Result<C::Backend, EstablishError> {
    let attempts_max = policy.attempts_max;
    let mut last_error = None;

    for attempt in 1..=attempts_max {
        match try_connect(connector, attempt).await {
            Ok(backend) => {
                tracing::info!(%target, attempt, "successfully connected to counter backend");
                return Ok(backend);
            }
            Err(e) => {
                tracing::warn!(
                    %target,
                    error = %e,
                    "failed to connect (attempt {attempt}/{attempts_max})"
                );
                last_error = Some(e);
            }
        }

        if attempt < attempts_max {
            delay.sleep(policy.delay).await;
        }
    }

    let last_error = last_error.unwrap_or_else(|| StorageError::connection("no attempt made"));
    tracing::error!(%target, attempts = attempts_max, error = %last_error, "giving up on counter backend");
    Err(EstablishError::ConnectionExhausted {
        attempts: attempts_max,
        last_error,
    })
}

/// One attempt: open, then prove liveness.
async fn try_connect<C: Connector>(connector: &C, attempt: u32) -> StorageResult<C::Backend> {
    let backend = connector.connect(attempt).await?;
    if let Err(e) = backend.ping().await {
        backend.close().await;
        return Err(e);
    }
    Ok(backend)
}

async fn prepare<B: CounterBackend>(backend: &B) -> StorageResult<SeedOutcome> {
    backend.ensure_schema().await?;
    backend.ensure_initialized().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{FaultConfig, FaultType, SimDelay};
    use crate::storage::SimConnector;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_secs(2))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts_max(), 30);
        assert_eq!(policy.delay(), Duration::from_secs(2));
    }

    #[test]
    #[should_panic(expected = "at least one attempt")]
    fn test_zero_attempts_rejected() {
        let _ = RetryPolicy::new(0, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds_without_waiting() {
        let connector = SimConnector::new(42);
        let delay = SimDelay::new();

        let backend = establish(&connector, &policy(30), &delay).await.unwrap();

        assert_eq!(backend.read().await.unwrap(), 0);
        assert_eq!(connector.attempts(), 1);
        assert!(delay.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_self_heals_before_budget_runs_out() {
        let connector = SimConnector::new(42)
            .with_fault(FaultConfig::new(FaultType::Connect, 1.0).with_max_triggers(4));
        let delay = SimDelay::new();

        let backend = establish(&connector, &policy(5), &delay).await.unwrap();

        assert_eq!(backend.read().await.unwrap(), 0);
        assert_eq!(connector.attempts(), 5);
        assert_eq!(delay.sleeps(), vec![Duration::from_secs(2); 4]);
        assert_eq!(delay.now_ms(), 8_000);
    }

    #[tokio::test]
    async fn test_exhaustion_is_fatal() {
        let connector =
            SimConnector::new(42).with_fault(FaultConfig::new(FaultType::Connect, 1.0));
        let delay = SimDelay::new();

        let err = establish(&connector, &policy(3), &delay).await.err().expect("establish should fail");

        match err {
            EstablishError::ConnectionExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.is_connection());
            }
            other => panic!("expected ConnectionExhausted, got {other:?}"),
        }
        assert_eq!(connector.attempts(), 3);
        // No wait after the final attempt
        assert_eq!(delay.sleeps().len(), 2);
        assert_eq!(connector.disk().value(), None);
    }

    #[tokio::test]
    async fn test_failed_ping_counts_as_failed_attempt() {
        let connector = SimConnector::new(42)
            .with_fault(FaultConfig::new(FaultType::Ping, 1.0).with_max_triggers(2));
        let delay = SimDelay::new();

        establish(&connector, &policy(3), &delay).await.unwrap();

        assert_eq!(connector.attempts(), 3);
        assert_eq!(delay.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_schema_failure_is_distinct() {
        let connector = SimConnector::new(42).with_fault(FaultConfig::new(FaultType::Schema, 1.0));
        let delay = SimDelay::new();

        let err = establish(&connector, &policy(3), &delay).await.err().expect("establish should fail");

        assert!(matches!(err, EstablishError::Schema(StorageError::Schema { .. })));
        // Schema failures are not retried
        assert_eq!(connector.attempts(), 1);
        assert!(delay.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_existing_counter_is_left_unchanged() {
        let connector = SimConnector::new(42);
        connector.disk().set_value(41);

        let backend = establish(&connector, &policy(1), &SimDelay::new())
            .await
            .unwrap();

        assert_eq!(backend.read().await.unwrap(), 41);
    }
}

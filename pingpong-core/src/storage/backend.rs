//! The `CounterBackend` trait.

use async_trait::async_trait;

use super::error::StorageResult;

/// What [`CounterBackend::ensure_initialized`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The counter did not exist and was created at 0.
    Created,
    /// The counter already existed with this value.
    Existing(u64),
}

impl SeedOutcome {
    /// The counter value after seeding.
    #[must_use]
    pub fn value(self) -> u64 {
        match self {
            Self::Created => 0,
            Self::Existing(value) => value,
        }
    }
}

/// Durable storage for one non-negative integer.
///
/// Implementations need not be safe under concurrent increments.
#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// Short name for logs ("postgres", "file", "sim").
    fn kind(&self) -> &'static str;

    /// Lightweight round trip proving the medium is reachable.
    async fn ping(&self) -> StorageResult<()>;

    /// Create the table/file container if absent.
    async fn ensure_schema(&self) -> StorageResult<()>;

    /// Insert the counter at 0 if absent; never touches an existing value.
    async fn ensure_initialized(&self) -> StorageResult<SeedOutcome>;

    /// Current committed value.
    async fn read(&self) -> StorageResult<u64>;

    /// Add one and return the NEW value.
    async fn increment_and_return(&self) -> StorageResult<u64>;

    /// Release the handle.
    async fn close(&self);
}

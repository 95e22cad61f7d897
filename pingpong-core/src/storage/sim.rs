//! SimBackend - Simulated Storage
//!
//! TigerStyle: in-memory counter with deterministic fault injection.
//!
//! The durable state lives in a [`SimDisk`] that outlives any backend, so a
//! test can drop a backend (crash) and connect again (restart) against the
//! same data.
//!
//! `increment_and_return` is deliberately a read, a yield and a write: the
//! backend itself is racy, and only the counter's lock keeps it correct.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::backend::{CounterBackend, SeedOutcome};
use super::error::{StorageError, StorageResult};
use crate::dst::{FaultConfig, FaultInjector, FaultType};
use crate::establish::Connector;

// =============================================================================
// SimDisk
// =============================================================================

#[derive(Debug, Default)]
struct DiskState {
    schema: bool,
    value: Option<u64>,
}

/// Shared durable state behind simulated backends.
#[derive(Debug, Clone, Default)]
pub struct SimDisk {
    state: Arc<Mutex<DiskState>>,
}

impl SimDisk {
    /// Empty disk: no schema, no counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed counter value, if seeded.
    #[must_use]
    pub fn value(&self) -> Option<u64> {
        self.lock().value
    }

    /// Overwrite the committed value (and mark the schema present).
    pub fn set_value(&self, value: u64) {
        let mut state = self.lock();
        state.schema = true;
        state.value = Some(value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DiskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// SimConnector
// =============================================================================

/// Connects [`SimBackend`]s to a [`SimDisk`] under a [`FaultInjector`].
#[derive(Debug, Clone)]
pub struct SimConnector {
    disk: SimDisk,
    faults: Arc<FaultInjector>,
    attempts: Arc<AtomicU32>,
}

impl SimConnector {
    /// Connector over a fresh disk with no faults.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_injector(SimDisk::new(), FaultInjector::new(seed))
    }

    /// Connector over an existing disk and fault set.
    #[must_use]
    pub fn with_injector(disk: SimDisk, faults: FaultInjector) -> Self {
        Self {
            disk,
            faults: Arc::new(faults),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Use an existing disk, e.g. to simulate a restart.
    #[must_use]
    pub fn with_disk(mut self, disk: SimDisk) -> Self {
        self.disk = disk;
        self
    }

    /// Declare a fault on this connector and every backend it opens.
    #[must_use]
    pub fn with_fault(self, fault: FaultConfig) -> Self {
        self.faults.add(fault);
        self
    }

    /// The shared disk.
    #[must_use]
    pub fn disk(&self) -> &SimDisk {
        &self.disk
    }

    /// The shared fault injector, for adding faults after startup.
    #[must_use]
    pub fn faults(&self) -> &Arc<FaultInjector> {
        &self.faults
    }

    /// Number of `connect` calls so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for SimConnector {
    type Backend = SimBackend;

    fn target(&self) -> String {
        "simulated disk".to_string()
    }

    async fn connect(&self, attempt: u32) -> StorageResult<SimBackend> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.faults.should_inject(FaultType::Connect) {
            return Err(StorageError::connection(format!(
                "simulated connection refused (attempt {attempt})"
            )));
        }
        Ok(SimBackend {
            disk: self.disk.clone(),
            faults: Arc::clone(&self.faults),
            closed: AtomicBool::new(false),
        })
    }
}

// =============================================================================
// SimBackend
// =============================================================================

/// In-memory backend over a [`SimDisk`].
#[derive(Debug)]
pub struct SimBackend {
    disk: SimDisk,
    faults: Arc<FaultInjector>,
    closed: AtomicBool,
}

impl SimBackend {
    fn check(&self, fault_type: FaultType) -> StorageResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::connection("backend closed"));
        }
        if !self.faults.should_inject(fault_type) {
            return Ok(());
        }
        let message = format!("simulated {fault_type:?} failure");
        Err(match fault_type {
            FaultType::Connect | FaultType::Ping => StorageError::connection(message),
            FaultType::Schema => StorageError::schema(message),
            FaultType::Read => StorageError::read(message),
            FaultType::Write => StorageError::write(message),
        })
    }

    fn committed(&self) -> StorageResult<u64> {
        let state = self.disk.lock();
        if !state.schema {
            return Err(StorageError::read("relation ping_counter does not exist"));
        }
        state
            .value
            .ok_or_else(|| StorageError::read("counter row missing"))
    }
}

#[async_trait]
impl CounterBackend for SimBackend {
    fn kind(&self) -> &'static str {
        "sim"
    }

    async fn ping(&self) -> StorageResult<()> {
        self.check(FaultType::Ping)
    }

    async fn ensure_schema(&self) -> StorageResult<()> {
        self.check(FaultType::Schema)?;
        self.disk.lock().schema = true;
        Ok(())
    }

    async fn ensure_initialized(&self) -> StorageResult<SeedOutcome> {
        self.check(FaultType::Schema)?;
        let mut state = self.disk.lock();
        if !state.schema {
            return Err(StorageError::schema("relation ping_counter does not exist"));
        }
        match state.value {
            Some(value) => Ok(SeedOutcome::Existing(value)),
            None => {
                state.value = Some(0);
                Ok(SeedOutcome::Created)
            }
        }
    }

    async fn read(&self) -> StorageResult<u64> {
        self.check(FaultType::Read)?;
        self.committed()
    }

    async fn increment_and_return(&self) -> StorageResult<u64> {
        self.check(FaultType::Write)?;
        let current = self.committed()?;

        tokio::task::yield_now().await;

        let next = current
            .checked_add(1)
            .ok_or_else(|| StorageError::write("counter overflow"))?;
        self.disk.lock().value = Some(next);
        Ok(next)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

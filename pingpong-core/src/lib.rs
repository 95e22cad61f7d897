//! PingPong Core - Durable Counter with DST
//!
//! TigerStyle: one logical counter, one writer lock, simulation-first.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               PingPong Core                  │
//! ├─────────────────────────────────────────────┤
//! │  Counter               │ RwLock + timeout   │
//! │  Establisher           │ Bounded retries    │
//! │  CounterBackend        │ Postgres/file/sim  │
//! ├─────────────────────────────────────────────┤
//! │  DST Framework          │ Fault injection   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pingpong_core::{establish, Counter, RetryPolicy, SimConnector, SimDelay};
//!
//! # tokio_test::block_on(async {
//! let connector = SimConnector::new(42);
//! let delay = SimDelay::new();
//! let backend = establish(&connector, &RetryPolicy::default(), &delay).await.unwrap();
//!
//! let counter = Counter::new(backend);
//! assert_eq!(counter.increment_and_get().await.unwrap(), 0);
//! assert_eq!(counter.peek().await.unwrap(), 1);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod counter;
pub mod dst;
pub mod establish;
pub mod storage;

// Re-export common types
pub use constants::*;
pub use counter::{Counter, CounterError};
pub use dst::{
    Delay, DeterministicRng, FaultConfig, FaultInjector, FaultType, SimClock, SimDelay, TokioDelay,
};
pub use establish::{establish, Connector, EstablishError, RetryPolicy};
pub use storage::{
    CounterBackend, FileBackend, FileConnector, FileWriteMode, SeedOutcome, SimBackend, SimConnector,
    SimDisk, StorageError, StorageResult,
};

#[cfg(feature = "postgres")]
pub use storage::{PostgresBackend, PostgresConnector};

//! Storage - Counter Backend Trait and Implementations
//!
//! TigerStyle: Abstract storage with simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CounterBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                    ↑                    ↑
//!          │                    │                    │
//! ┌────────┴────────┐  ┌────────┴────────┐  ┌────────┴────────┐
//! │   SimBackend    │  │   FileBackend   │  │ PostgresBackend │
//! │   (testing)     │  │  (local file)   │  │  (production)   │
//! └─────────────────┘  └─────────────────┘  └─────────────────┘
//! ```
//!
//! Every backend stores exactly one non-negative integer. Backends are not
//! required to be safe under concurrent increments; [`crate::Counter`]
//! serializes them.

mod backend;
mod error;
mod file;
mod sim;

#[cfg(feature = "postgres")]
mod postgres;

pub use backend::{CounterBackend, SeedOutcome};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileConnector, FileWriteMode};
pub use sim::{SimBackend, SimConnector, SimDisk};

#[cfg(feature = "postgres")]
pub use postgres::{PostgresBackend, PostgresConnector};

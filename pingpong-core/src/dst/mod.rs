//! DST - Deterministic Simulation Testing
//!
//! TigerBeetle/FoundationDB-style simulation support for the counter.
//!
//! # Philosophy
//!
//! > "If you're not testing with fault injection, you're not testing."
//!
//! Time and failure are the two things the counter cannot control: the
//! establisher waits between attempts and the backend fails. Both go through
//! injectable interfaces here so tests never sleep and never depend on luck.
//!
//! # Usage
//!
//! ```rust
//! use pingpong_core::dst::{FaultConfig, FaultInjector, FaultType};
//!
//! let faults = FaultInjector::new(42)
//!     .with_fault(FaultConfig::new(FaultType::Connect, 1.0).with_max_triggers(3));
//!
//! assert!(faults.should_inject(FaultType::Connect));
//! ```
//!
//! Run with explicit seed for reproducibility:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

mod clock;
mod delay;
mod fault;
mod rng;

pub use clock::SimClock;
pub use delay::{Delay, SimDelay, TokioDelay};
pub use fault::{FaultConfig, FaultInjector, FaultType};
pub use rng::DeterministicRng;

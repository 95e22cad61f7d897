//! Fault Injection
//!
//! TigerStyle: faults are declared up front, decided by a seeded RNG and
//! optionally capped, so "fails three times then recovers" is expressible.

use std::sync::{Mutex, PoisonError};

use super::rng::DeterministicRng;

/// Backend operations a fault can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultType {
    /// Opening the connection/handle
    Connect,
    /// Liveness round trip
    Ping,
    /// Schema creation and counter seeding
    Schema,
    /// Reading the counter
    Read,
    /// Incrementing the counter
    Write,
}

/// One declared fault.
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    /// Which operation fails
    pub fault_type: FaultType,
    /// Chance of failing each time the operation runs
    pub probability: f64,
    /// Stop injecting after this many failures (`None` = forever)
    pub max_triggers: Option<u32>,
}

impl FaultConfig {
    /// Fail `fault_type` with the given probability, forever.
    ///
    /// # Panics
    /// Panics if probability is outside `0.0..=1.0`.
    #[must_use]
    pub fn new(fault_type: FaultType, probability: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "fault probability {probability} must be within 0.0..=1.0"
        );
        Self {
            fault_type,
            probability,
            max_triggers: None,
        }
    }

    /// Stop after `count` injected failures.
    #[must_use]
    pub fn with_max_triggers(mut self, count: u32) -> Self {
        self.max_triggers = Some(count);
        self
    }
}

#[derive(Debug)]
struct FaultState {
    rng: DeterministicRng,
    faults: Vec<(FaultConfig, u32)>,
}

/// Decides whether an operation should fail.
///
/// Shared by reference across connector and backends; interior state sits
/// behind a mutex that is never held across an await.
#[derive(Debug)]
pub struct FaultInjector {
    state: Mutex<FaultState>,
}

impl FaultInjector {
    /// Create an injector with no faults.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(FaultState {
                rng: DeterministicRng::new(seed),
                faults: Vec::new(),
            }),
        }
    }

    /// Create an injector seeded from `DST_SEED`, falling back to `seed`.
    #[must_use]
    pub fn from_env_or(seed: u64) -> Self {
        Self {
            state: Mutex::new(FaultState {
                rng: DeterministicRng::from_env_or(seed),
                faults: Vec::new(),
            }),
        }
    }

    /// Declare a fault.
    #[must_use]
    pub fn with_fault(self, fault: FaultConfig) -> Self {
        self.add(fault);
        self
    }

    /// Declare a fault on an injector that is already shared.
    pub fn add(&self, fault: FaultConfig) {
        self.lock().faults.push((fault, 0));
    }

    /// Remove every declared fault of the given type.
    pub fn clear(&self, fault_type: FaultType) {
        self.lock()
            .faults
            .retain(|(fault, _)| fault.fault_type != fault_type);
    }

    /// Roll for `fault_type`. Returns true if the operation must fail.
    pub fn should_inject(&self, fault_type: FaultType) -> bool {
        let mut state = self.lock();
        let FaultState { rng, faults } = &mut *state;

        for (fault, triggered) in faults.iter_mut() {
            if fault.fault_type != fault_type {
                continue;
            }
            if fault.max_triggers.is_some_and(|max| *triggered >= max) {
                continue;
            }
            if rng.next_bool(fault.probability) {
                *triggered += 1;
                tracing::debug!(?fault_type, triggered = *triggered, "injecting fault");
                return true;
            }
        }
        false
    }

    /// How many times faults of this type have fired.
    #[must_use]
    pub fn injected_count(&self, fault_type: FaultType) -> u32 {
        self.lock()
            .faults
            .iter()
            .filter(|(fault, _)| fault.fault_type == fault_type)
            .map(|(_, triggered)| *triggered)
            .sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

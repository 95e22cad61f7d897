//! DeterministicRng - Seeded Randomness
//!
//! TigerStyle: every random decision in a simulation comes from one seed,
//! so a failing run can be replayed exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Environment variable that overrides the seed of [`DeterministicRng::from_env_or`].
pub const DST_SEED_ENV: &str = "DST_SEED";

/// Seeded RNG for fault decisions.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    inner: ChaCha8Rng,
}

impl DeterministicRng {
    /// Create an RNG from an explicit seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Use `DST_SEED` when set and parseable, otherwise `fallback`.
    ///
    /// The chosen seed is logged so the run can be reproduced.
    #[must_use]
    pub fn from_env_or(fallback: u64) -> Self {
        let seed = std::env::var(DST_SEED_ENV)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(fallback);
        tracing::info!(seed, "DST seed");
        Self::new(seed)
    }

    /// Return true with the given probability.
    ///
    /// # Panics
    /// Panics if probability is outside `0.0..=1.0`.
    pub fn next_bool(&mut self, probability: f64) -> bool {
        assert!(
            (0.0..=1.0).contains(&probability),
            "probability {probability} must be within 0.0..=1.0"
        );
        self.inner.gen_bool(probability)
    }
}

//! SimClock - Simulated Time
//!
//! TigerStyle: Deterministic, controllable time for simulation.

use std::time::Duration;

use crate::constants::DST_TIME_ADVANCE_MS_MAX;

/// A simulated clock for deterministic testing.
///
/// TigerStyle:
/// - Time only moves forward
/// - All time operations are explicit
/// - No reliance on system time
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    /// Current time in milliseconds since simulation start
    current_ms: u64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    ///
    /// # Example
    /// ```
    /// use pingpong_core::dst::SimClock;
    /// let clock = SimClock::new();
    /// assert_eq!(clock.now_ms(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Get current time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.current_ms
    }

    /// Advance time by the given milliseconds and return the new time.
    ///
    /// # Panics
    /// Panics if ms exceeds `DST_TIME_ADVANCE_MS_MAX`.
    pub fn advance_ms(&mut self, ms: u64) -> u64 {
        assert!(
            ms <= DST_TIME_ADVANCE_MS_MAX,
            "advance_ms({}) exceeds max ({})",
            ms,
            DST_TIME_ADVANCE_MS_MAX
        );

        let old_time = self.current_ms;
        self.current_ms = self.current_ms.saturating_add(ms);

        // Postcondition
        assert!(self.current_ms >= old_time, "time must not go backwards");

        self.current_ms
    }

    /// Advance time by a `Duration`, truncated to whole milliseconds.
    pub fn advance(&mut self, duration: Duration) -> u64 {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.advance_ms(ms)
    }
}

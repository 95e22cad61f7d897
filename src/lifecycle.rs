//! Service Lifecycle
//!
//! ```text
//! Starting ──▶ Connecting ──▶ Ready ──▶ Serving ──▶ Draining ──▶ Stopped
//!                   │
//!                   └──▶ Failed
//! ```
//!
//! Every transition is logged; illegal transitions are bugs and panic.

use std::fmt;

/// Process phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Connecting,
    Ready,
    Serving,
    Draining,
    Stopped,
    Failed,
}

impl Phase {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    fn can_become(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Connecting)
                | (Self::Connecting, Self::Ready | Self::Failed)
                | (Self::Ready, Self::Serving | Self::Failed)
                | (Self::Serving, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs the current phase.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        tracing::info!(phase = %Phase::Starting, "lifecycle");
        Self {
            phase: Phase::Starting,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`.
    ///
    /// # Panics
    /// Panics on a transition the diagram above does not allow.
    pub fn advance(&mut self, next: Phase) {
        assert!(
            self.phase.can_become(next),
            "illegal lifecycle transition {} -> {}",
            self.phase,
            next
        );

        if next == Phase::Failed {
            tracing::error!(from = %self.phase, phase = %next, "lifecycle");
        } else {
            tracing::info!(from = %self.phase, phase = %next, "lifecycle");
        }
        self.phase = next;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

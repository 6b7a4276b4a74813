//! Pause policies for failed collection cycles
//!
//! The scheduler asks its policy how long to wait before retrying after a
//! failed cycle. The default is a flat pause; exponential growth with a cap
//! can be substituted without touching the scheduler's state machine.

use std::time::Duration;

/// Strategy deciding the pause before retry attempt `attempt` (1-based).
pub trait BackoffPolicy: Send + Sync {
    fn compute_delay(&self, attempt: u32) -> Duration;
}

/// Flat pause regardless of how many cycles have failed in a row.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffPolicy for FixedDelay {
    fn compute_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubling pause, capped.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    cap: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn compute_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.cap);
        delay.min(self.cap)
    }
}

//! Message types for the collector actor

use tokio::sync::oneshot;

/// Commands that can be sent to a TelemetryCollectorActor
#[derive(Debug)]
pub enum CollectorCommand {
    /// Run a collection cycle immediately (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations.
    CollectNow {
        /// Channel to send the result back
        respond_to: oneshot::Sender<anyhow::Result<CycleOutcome>>,
    },

    /// Update the pause between successful cycles
    ///
    /// Takes effect when the next pause starts.
    UpdateInterval {
        /// New interval in seconds
        interval_secs: u64,
    },

    /// Gracefully shut down the collector
    ///
    /// An in-flight cycle completes before the actor exits.
    Shutdown,
}

/// What one collection cycle achieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Operational records decoded from the response
    pub operational_received: usize,

    /// Operational records actually inserted (duplicates skipped)
    pub operational_inserted: usize,

    /// Services covered by the health report
    pub health_services: usize,
}

//! TelemetryCollectorActor - drives periodic collection cycles
//!
//! One actor polls one security server. Each cycle acquires operational
//! data for a trailing window, persists it, acquires current health data
//! and persists that too.
//!
//! ## State machine
//!
//! ```text
//! Idle --pause elapses--> Collecting --success--> Idle
//!                              |
//!                              +------failure--> Backoff(n) --pause--> Collecting
//! ```
//!
//! The only terminal state is an explicit shutdown (command or closed
//! channel). A transport or persistence failure is caught at the cycle
//! boundary, logged, and answered with a policy-computed pause; it never
//! escapes the loop. Parse failures never even reach the loop - the
//! response parser degrades them to empty batches. Cancellation is
//! cooperative: commands are observed between cycles and during pauses,
//! not mid-cycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

use crate::HealthSnapshot;
use crate::backoff::BackoffPolicy;
use crate::client::MetricsClient;
use crate::config::Config;
use crate::identifier::XRoadIdentifier;
use crate::protocol::SearchWindow;
use crate::storage::TelemetryStore;

use super::messages::{CollectorCommand, CycleOutcome};

enum LoopState {
    Idle,
    Backoff(u32),
}

/// Actor that runs the collection loop for a single security server
pub struct TelemetryCollectorActor {
    client: MetricsClient,
    store: Arc<dyn TelemetryStore>,
    backoff: Box<dyn BackoffPolicy>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<CollectorCommand>,

    /// Pause between successful cycles
    poll_interval: Duration,

    /// Trailing window queried for operational data
    collection_window: chrono::Duration,

    /// Optional member filter for operational data queries
    client_filter: Option<XRoadIdentifier>,
}

impl TelemetryCollectorActor {
    pub fn new(
        config: &Config,
        store: Arc<dyn TelemetryStore>,
        backoff: Box<dyn BackoffPolicy>,
        command_rx: mpsc::Receiver<CollectorCommand>,
    ) -> Result<Self> {
        let client = MetricsClient::new(config)?;

        let client_filter = config
            .client_filter
            .as_deref()
            .map(XRoadIdentifier::parse_compact)
            .transpose()
            .context("invalid client_filter in configuration")?;

        Ok(Self {
            client,
            store,
            backoff,
            command_rx,
            poll_interval: config.poll_interval(),
            collection_window: config.collection_window(),
            client_filter,
        })
    }

    /// Run the actor's main loop.
    ///
    /// The first cycle starts immediately; afterwards the loop pauses for
    /// the poll interval (after a successful cycle) or the backoff delay
    /// (after a failed one). Runs until a Shutdown command is received or
    /// the command channel is closed.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting telemetry collector");

        let mut state = LoopState::Idle;
        let mut next_pause = Duration::ZERO;

        loop {
            tokio::select! {
                _ = time::sleep(next_pause) => {
                    match self.run_cycle().await {
                        Ok(outcome) => {
                            debug!(
                                "cycle complete: {} received, {} inserted, {} health services",
                                outcome.operational_received,
                                outcome.operational_inserted,
                                outcome.health_services,
                            );
                            state = LoopState::Idle;
                            next_pause = self.poll_interval;
                        }
                        Err(e) => {
                            error!("collection cycle failed: {e:#}");
                            let attempt = match state {
                                LoopState::Backoff(attempt) => attempt + 1,
                                LoopState::Idle => 1,
                            };
                            state = LoopState::Backoff(attempt);
                            next_pause = self.backoff.compute_delay(attempt);
                            debug!("retrying in {next_pause:?} (attempt {attempt})");
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(CollectorCommand::CollectNow { respond_to }) => {
                            debug!("received CollectNow command");
                            let result = self.run_cycle().await;
                            match &result {
                                Ok(_) => {
                                    state = LoopState::Idle;
                                    next_pause = self.poll_interval;
                                }
                                Err(_) => {
                                    let attempt = match state {
                                        LoopState::Backoff(attempt) => attempt + 1,
                                        LoopState::Idle => 1,
                                    };
                                    state = LoopState::Backoff(attempt);
                                    next_pause = self.backoff.compute_delay(attempt);
                                }
                            }
                            let _ = respond_to.send(result);
                        }

                        Some(CollectorCommand::UpdateInterval { interval_secs }) => {
                            debug!("updating poll interval to {interval_secs}s");
                            self.poll_interval = Duration::from_secs(interval_secs);
                        }

                        Some(CollectorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        debug!("telemetry collector stopped");
    }

    /// Run one collection cycle.
    ///
    /// Transport and persistence failures propagate to the caller; the
    /// loop logs them and schedules the retry pause.
    #[instrument(skip(self))]
    async fn run_cycle(&self) -> Result<CycleOutcome> {
        let to = Utc::now();
        let window = SearchWindow {
            from: to - self.collection_window,
            to,
        };

        let records = self
            .client
            .fetch_operational_data(&window, self.client_filter.as_ref())
            .await?;
        let operational_received = records.len();

        let operational_inserted = self.store.append_operational(records).await?;

        let report = self.client.fetch_health_data().await?;
        let collected_at = Utc::now();
        let snapshots: Vec<HealthSnapshot> = report
            .services
            .into_iter()
            .map(|service| service.into_snapshot(collected_at))
            .collect();
        let health_services = snapshots.len();

        self.store.append_health(snapshots).await?;

        info!(
            "collected {} operational records ({} new) and {} health services",
            operational_received, operational_inserted, health_services,
        );

        Ok(CycleOutcome {
            operational_received,
            operational_inserted,
            health_services,
        })
    }
}

/// Handle for controlling a TelemetryCollectorActor
///
/// This handle provides a typed API for sending commands to the actor.
/// It can be cloned and shared across tasks.
#[derive(Clone)]
pub struct CollectorHandle {
    sender: mpsc::Sender<CollectorCommand>,
}

impl CollectorHandle {
    /// Spawn a new collector actor.
    ///
    /// Fails if the configuration carries a malformed client identifier or
    /// client filter.
    pub fn spawn(
        config: &Config,
        store: Arc<dyn TelemetryStore>,
        backoff: Box<dyn BackoffPolicy>,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = TelemetryCollectorActor::new(config, store, backoff, cmd_rx)?;
        tokio::spawn(actor.run());

        Ok(Self { sender: cmd_tx })
    }

    /// Run a collection cycle immediately.
    pub async fn collect_now(&self) -> Result<CycleOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorCommand::CollectNow { respond_to: tx })
            .await
            .context("failed to send CollectNow command")?;

        rx.await.context("failed to receive response")?
    }

    /// Update the pause between successful cycles.
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(CollectorCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    /// Gracefully shut down the collector.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(CollectorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}

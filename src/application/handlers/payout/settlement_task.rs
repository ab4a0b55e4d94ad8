//! SettlementTask - Background service driving settlement cycles.
//!
//! Runs one cycle per interval tick. The shutdown signal is only observed
//! between cycles, so a mid-flight cycle always finishes committing any
//! already-confirmed group before the task exits; entries merely claimed
//! stay `Scheduled` and the next start resumes them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::Timestamp;

use super::run_settlement_cycle::RunSettlementCycleHandler;

/// Configuration for the settlement task.
#[derive(Debug, Clone)]
pub struct SettlementTaskConfig {
    /// Time between cycle starts.
    pub cycle_interval: Duration,
}

impl Default for SettlementTaskConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(15 * 60),
        }
    }
}

/// Background service running settlement cycles on a fixed interval.
pub struct SettlementTask {
    handler: Arc<RunSettlementCycleHandler>,
    config: SettlementTaskConfig,
}

impl SettlementTask {
    /// Creates a task with default configuration.
    pub fn new(handler: Arc<RunSettlementCycleHandler>) -> Self {
        Self {
            handler,
            config: SettlementTaskConfig::default(),
        }
    }

    /// Creates a task with custom configuration.
    pub fn with_config(
        handler: Arc<RunSettlementCycleHandler>,
        config: SettlementTaskConfig,
    ) -> Self {
        Self { handler, config }
    }

    /// Runs cycles until the shutdown signal flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.cycle_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("settlement task stopping");
                        return;
                    }
                }
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    async fn run_cycle(&self) {
        // One cycle's failure never kills the task; the next tick retries.
        if let Err(e) = self.handler.handle(Timestamp::now()).await {
            tracing::error!(error = %e, "settlement cycle failed");
        }
    }
}

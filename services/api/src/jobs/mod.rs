use crate::web::state::AppState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub mod tasks;

pub use tasks::{run_release_cycle, CycleReport};

/// Drives the inactivity state machine on a fixed period.
pub struct ReleaseScheduler {
    state: Arc<AppState>,
    period: Duration,
    shutdown: CancellationToken,
}

impl ReleaseScheduler {
    pub fn new(state: Arc<AppState>, period: Duration, shutdown: CancellationToken) -> Self {
        Self {
            state,
            period,
            shutdown,
        }
    }

    /// Spawns the release job. It runs once immediately, then every period,
    /// until the shutdown token is cancelled.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!("Starting release job (every {}s)", self.period.as_secs());
        tokio::spawn(Self::release_job(self))
    }

    async fn release_job(scheduler: Arc<Self>) {
        let mut ticker = interval(scheduler.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = scheduler.shutdown.cancelled() => {
                    info!("Release job stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match run_release_cycle(&scheduler.state, Utc::now()).await {
                        Ok(report) => info!(
                            "Release cycle: {} evaluated, {} transitions, {} reminders ({} skipped), {} notes released, {} failures",
                            report.evaluated,
                            report.transitions,
                            report.reminders_sent,
                            report.reminders_skipped,
                            report.notes_released,
                            report.failures
                        ),
                        Err(e) => error!("Release cycle failed: {}", e),
                    }
                }
            }
        }
    }
}

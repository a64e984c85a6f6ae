// Scheduler engine: sleeps until the next trigger and runs a rotation pass

use crate::scheduler::advancer::{AdvanceReport, RotationAdvancer};
use crate::schedule::ScheduleTrigger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Scheduler trait for rotation scheduling operations
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Run until stopped or the trigger is exhausted
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Signal the loop to stop; an in-flight pass completes first
    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Run a single pass immediately
    async fn run_tick(&self) -> Result<AdvanceReport, Box<dyn std::error::Error + Send + Sync>>;
}

/// Main scheduler engine implementation
pub struct SchedulerEngine {
    trigger: Arc<dyn ScheduleTrigger>,
    advancer: Arc<RotationAdvancer>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SchedulerEngine {
    pub fn new(trigger: Arc<dyn ScheduleTrigger>, advancer: Arc<RotationAdvancer>) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            trigger,
            advancer,
            shutdown_tx,
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Next fire time, never at or before the last one that already ran
    fn next_fire(&self, last_fired: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        let reference = match last_fired {
            Some(last) if last > now => last,
            _ => now,
        };
        self.trigger.next_fire_after(reference)
    }
}

#[async_trait]
impl Scheduler for SchedulerEngine {
    #[instrument(skip(self))]
    async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(schedule = %self.trigger.describe(), "Starting scheduler engine");

        let mut shutdown_rx = self.shutdown_receiver();
        let mut last_fired: Option<DateTime<Utc>> = None;

        loop {
            let Some(fire_at) = self.next_fire(last_fired) else {
                warn!("Schedule has no further fire times, stopping scheduler");
                break;
            };

            let wait = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            info!(
                next_fire = %fire_at,
                wait_seconds = wait.as_secs(),
                "Waiting for next rotation tick"
            );

            tokio::select! {
                _ = sleep(wait) => {
                    last_fired = Some(fire_at);
                    debug!(fire_at = %fire_at, "Rotation tick due");

                    match self.run_tick().await {
                        Ok(report) => {
                            info!(
                                advanced = report.advanced,
                                empty = report.empty,
                                failed = report.failed,
                                "Rotation tick completed"
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "Rotation tick failed, will retry next tick");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        info!("Scheduler engine stopped");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Stopping scheduler engine");
        // No receivers only means the loop already exited
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    async fn run_tick(&self) -> Result<AdvanceReport, Box<dyn std::error::Error + Send + Sync>> {
        let report = self.advancer.advance_all().await?;
        Ok(report)
    }
}

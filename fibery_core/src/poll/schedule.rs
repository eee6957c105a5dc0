use crate::poll::engine::PollCycle;
use crate::poll::models::PollOutcome;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Runs a poll cycle on a fixed interval.
///
/// Cycles never overlap: a tick that arrives while a cycle is still running is
/// delayed until it finishes.
pub struct PollScheduler {
    cycle: Arc<PollCycle>,
    interval: Duration,
}

impl PollScheduler {
    #[tracing::instrument(level = "debug", skip(cycle))]
    pub fn new(cycle: Arc<PollCycle>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidInput("poll interval must be > 0".to_string()));
        }
        Ok(Self { cycle, interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle now.
    pub async fn tick(&self) -> Result<PollOutcome> {
        self.cycle.run().await
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// The first cycle runs immediately. Failures are logged and the loop keeps going;
    /// the checkpoint is untouched by a failed cycle so the next tick retries.
    #[tracing::instrument(
        level = "info",
        skip(self, shutdown),
        fields(interval_secs = self.interval.as_secs())
    )]
    pub async fn run_loop(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(outcome) => tracing::info!(
                            run_id = %outcome.run_id,
                            emitted = outcome.emitted,
                            advanced = outcome.checkpoint.is_some(),
                            "poll cycle finished"
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            retryable = e.is_retryable(),
                            "poll cycle failed"
                        ),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("poll scheduler stopped");
        Ok(())
    }
}

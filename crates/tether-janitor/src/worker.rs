//! Background worker for continuous Janitor operation

use crate::{Janitor, JanitorConfig, JanitorError, JanitorMetrics};
use tether_domain::traits::MaintenanceStore;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Background worker that runs Janitor on a schedule
///
/// The first sweep runs immediately, then once per interval.
///
/// # Examples
///
/// ```no_run
/// use tether_janitor::{JanitorWorker, JanitorConfig};
/// use tether_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::new("tether.db")?;
///     let mut worker = JanitorWorker::new(JanitorConfig::default());
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(store).await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: Janitor,
    interval: Duration,
}

impl JanitorWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        let interval = config.sweep_interval();
        Self {
            janitor: Janitor::new(config),
            interval,
        }
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Override the sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the worker until Ctrl+C
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run<S>(&mut self, mut store: S) -> Result<(), JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        self.janitor.config().validate()?;
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, "Janitor worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting sweep cycle");

                    match self.janitor.sweep(&mut store) {
                        Ok(metrics) => {
                            tracing::info!(
                                sweeps = metrics.sweep_count,
                                repairs = metrics.total_repairs(),
                                "Sweep completed"
                            );
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Sweep failed");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping janitor");
                    break;
                }
            }
        }

        tracing::info!("Janitor stopped. Final metrics:\n{}", self.janitor.metrics().summary());
        Ok(())
    }

    /// Run for a specific number of cycles, stopping at the first failure
    pub async fn run_cycles<S>(&mut self, mut store: S, cycles: usize) -> Result<S, JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!(cycles, interval = ?self.interval, "Janitor worker started");

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);

            if let Err(e) = self.janitor.sweep(&mut store) {
                tracing::error!(error = %e, "Sweep {}/{} failed", cycle + 1, cycles);
                return Err(e);
            }
        }

        tracing::info!("Janitor finished {} cycles. Final metrics:\n{}", cycles, self.janitor.metrics().summary());
        Ok(store)
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}

//! Core Janitor implementation

use std::time::Instant;

use tether_domain::traits::MaintenanceStore;

use crate::metrics::MaintenanceTask;
use crate::{JanitorConfig, JanitorError, JanitorMetrics};

/// Janitor service for periodic store maintenance
///
/// Responsible for:
/// - Recomputing interaction scores as decay moves them
/// - Reconciling tag counts and dropping unused tags
/// - Repairing unreadable contact data
///
/// # Examples
///
/// ```no_run
/// use tether_janitor::{Janitor, JanitorConfig};
/// use tether_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteStore::new("tether.db")?;
/// let mut janitor = Janitor::new(JanitorConfig::default());
///
/// let metrics = janitor.sweep(&mut store)?;
/// println!("{}", metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    metrics: JanitorMetrics,
}

impl Janitor {
    /// Create a new Janitor with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        Self {
            config,
            metrics: JanitorMetrics::new(),
        }
    }

    /// Create a Janitor with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Perform a complete sweep cycle
    ///
    /// In dry-run mode the store is only audited. Otherwise tags are
    /// reconciled, contact data repaired and scores recomputed, each when
    /// enabled. Returns the updated metrics after the sweep.
    pub fn sweep<S>(&mut self, store: &mut S) -> Result<JanitorMetrics, JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        let start = Instant::now();

        if self.config.dry_run {
            self.audit(store)?;
        } else {
            if self.config.reconcile_tags {
                self.reconcile_tags(store)?;
            }
            if self.config.repair_contacts {
                self.repair_contacts(store)?;
            }
            if self.config.recompute_scores {
                self.recompute_scores(store)?;
            }
        }

        self.metrics.record_sweep();
        self.metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        Ok(self.metrics.clone())
    }

    fn audit<S>(&mut self, store: &mut S) -> Result<(), JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        let audit = store
            .audit()
            .map_err(|e| JanitorError::Store(e.to_string()))?;

        if audit.is_clean() {
            tracing::info!(entities = audit.entities, "DRY RUN: store is consistent");
        } else {
            tracing::info!(
                stale_tag_counts = audit.stale_tag_counts,
                orphan_tags = audit.orphan_tags,
                corrupt_contacts = audit.corrupt_contact_blobs,
                "DRY RUN: would repair store"
            );
        }
        if self.config.recompute_scores {
            tracing::info!(entities = audit.entities, "DRY RUN: would recompute scores");
        }

        self.metrics.record_audit(audit);
        Ok(())
    }

    fn reconcile_tags<S>(&mut self, store: &mut S) -> Result<(), JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        let result = store
            .reconcile_tag_counts()
            .map_err(|e| JanitorError::Store(e.to_string()))?;
        self.metrics.record(MaintenanceTask::TagCountCorrection, result.corrected);
        self.metrics.record(MaintenanceTask::TagRemoval, result.removed);
        Ok(())
    }

    fn repair_contacts<S>(&mut self, store: &mut S) -> Result<(), JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        let repaired = store
            .repair_contact_blobs()
            .map_err(|e| JanitorError::Store(e.to_string()))?;
        if repaired > 0 {
            tracing::warn!(repaired, "Repaired unreadable contact data");
        }
        self.metrics.record(MaintenanceTask::ContactRepair, repaired);
        Ok(())
    }

    fn recompute_scores<S>(&mut self, store: &mut S) -> Result<(), JanitorError>
    where
        S: MaintenanceStore,
        S::Error: std::fmt::Display,
    {
        let count = store
            .recompute_all_scores()
            .map_err(|e| JanitorError::Store(e.to_string()))?;
        tracing::debug!(entities = count, "Scores recomputed");
        self.metrics.record(MaintenanceTask::ScoreRecompute, count);
        Ok(())
    }
}

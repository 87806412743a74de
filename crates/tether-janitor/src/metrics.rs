//! Metrics collection for Janitor operations

use std::collections::BTreeMap;
use std::fmt;

use tether_domain::traits::MaintenanceAudit;

/// Maintenance tasks tracked in metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaintenanceTask {
    /// Score recomputation
    ScoreRecompute,
    /// Tag count correction
    TagCountCorrection,
    /// Unused tag removal
    TagRemoval,
    /// Contact data repair
    ContactRepair,
}

impl fmt::Display for MaintenanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MaintenanceTask::ScoreRecompute => "Scores recomputed",
            MaintenanceTask::TagCountCorrection => "Tag counts corrected",
            MaintenanceTask::TagRemoval => "Unused tags removed",
            MaintenanceTask::ContactRepair => "Contact records repaired",
        };
        f.write_str(label)
    }
}

/// Metrics collected during Janitor operations
///
/// Tracks rows touched per task across sweeps, plus the latest dry-run audit.
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Rows touched per task
    pub touched: BTreeMap<MaintenanceTask, usize>,

    /// Findings of the most recent dry-run sweep
    pub last_audit: Option<MaintenanceAudit>,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record rows touched by a task
    pub fn record(&mut self, task: MaintenanceTask, count: usize) {
        *self.touched.entry(task).or_insert(0) += count;
    }

    /// Rows touched by one task across all sweeps
    pub fn count(&self, task: MaintenanceTask) -> usize {
        self.touched.get(&task).copied().unwrap_or(0)
    }

    /// Record a dry-run audit
    pub fn record_audit(&mut self, audit: MaintenanceAudit) {
        self.last_audit = Some(audit);
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Rows repaired across all tasks except score recomputation
    pub fn total_repairs(&self) -> usize {
        self.touched
            .iter()
            .filter(|(task, _)| **task != MaintenanceTask::ScoreRecompute)
            .map(|(_, count)| count)
            .sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.touched.clear();
        self.last_audit = None;
        self.sweep_count = 0;
        self.total_runtime_ms = 0;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ];

        if !self.touched.is_empty() {
            lines.push(String::new());
            for (task, count) in &self.touched {
                lines.push(format!("  {}: {}", task, count));
            }
        }

        if let Some(audit) = &self.last_audit {
            lines.push(String::new());
            lines.push(format!("Last audit ({} entities):", audit.entities));
            lines.push(format!("  Stale tag counts: {}", audit.stale_tag_counts));
            lines.push(format!("  Unused tags: {}", audit.orphan_tags));
            lines.push(format!("  Corrupt contact records: {}", audit.corrupt_contact_blobs));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = JanitorMetrics::new();
        assert_eq!(metrics.total_repairs(), 0);
        assert_eq!(metrics.count(MaintenanceTask::ScoreRecompute), 0);
        assert_eq!(metrics.sweep_count, 0);
    }

    #[test]
    fn test_record_tasks() {
        let mut metrics = JanitorMetrics::new();
        metrics.record(MaintenanceTask::ScoreRecompute, 5);
        metrics.record(MaintenanceTask::TagRemoval, 3);
        metrics.record(MaintenanceTask::ScoreRecompute, 2);
        metrics.record(MaintenanceTask::ContactRepair, 1);

        assert_eq!(metrics.count(MaintenanceTask::ScoreRecompute), 7);
        assert_eq!(metrics.total_repairs(), 4);
    }

    #[test]
    fn test_reset() {
        let mut metrics = JanitorMetrics::new();
        metrics.record(MaintenanceTask::TagCountCorrection, 10);
        metrics.record_audit(MaintenanceAudit::default());
        metrics.record_sweep();

        metrics.reset();

        assert_eq!(metrics.total_repairs(), 0);
        assert!(metrics.last_audit.is_none());
        assert_eq!(metrics.sweep_count, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = JanitorMetrics::new();
        metrics.record(MaintenanceTask::ScoreRecompute, 12);
        metrics.record(MaintenanceTask::ContactRepair, 1);
        metrics.record_audit(MaintenanceAudit { entities: 12, orphan_tags: 2, ..Default::default() });
        metrics.record_sweep();
        metrics.total_runtime_ms = 120;

        let summary = metrics.summary();
        assert!(summary.contains("Sweep cycles: 1"));
        assert!(summary.contains("Total runtime: 120ms"));
        assert!(summary.contains("Scores recomputed: 12"));
        assert!(summary.contains("Contact records repaired: 1"));
        assert!(summary.contains("Unused tags: 2"));
    }
}

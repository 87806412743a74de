//! Configuration for Janitor operations
//!
//! Defines which maintenance tasks run and how often.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::JanitorError;

/// Configuration for the Janitor service
///
/// # Examples
///
/// ```
/// use tether_janitor::JanitorConfig;
///
/// // Default configuration (hourly)
/// let config = JanitorConfig::default();
/// assert_eq!(config.sweep_interval_minutes, 60);
///
/// // Keep scores fresh on a busy store
/// let config = JanitorConfig::frequent();
/// assert_eq!(config.sweep_interval_minutes, 15);
///
/// // Scores only, a few times a day
/// let config = JanitorConfig::relaxed();
/// assert!(!config.repair_contacts);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// How often to run the sweep cycle (in minutes)
    /// Default: every 60 minutes
    pub sweep_interval_minutes: u64,

    /// Recompute every entity's interaction score
    ///
    /// Scores decay with wall-clock time, so they go stale between
    /// interactions whenever a decay factor is set.
    #[serde(default = "default_true")]
    pub recompute_scores: bool,

    /// Reset tag counts from the entity links and drop unused tags
    #[serde(default = "default_true")]
    pub reconcile_tags: bool,

    /// Replace unreadable contact data with an empty record
    #[serde(default = "default_true")]
    pub repair_contacts: bool,

    /// Dry-run mode: audit and log what would change without writing
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JanitorConfig {
    /// Hourly sweep running every task
    fn default() -> Self {
        Self {
            sweep_interval_minutes: 60,
            recompute_scores: true,
            reconcile_tags: true,
            repair_contacts: true,
            dry_run: false,
        }
    }
}

impl JanitorConfig {
    /// Every task, every 15 minutes
    pub fn frequent() -> Self {
        Self {
            sweep_interval_minutes: 15,
            ..Self::default()
        }
    }

    /// Score recomputation only, every 6 hours
    pub fn relaxed() -> Self {
        Self {
            sweep_interval_minutes: 360,
            recompute_scores: true,
            reconcile_tags: false,
            repair_contacts: false,
            dry_run: false,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Result<Self, JanitorError> {
        match name.trim().to_lowercase().as_str() {
            "default" => Ok(Self::default()),
            "frequent" => Ok(Self::frequent()),
            "relaxed" => Ok(Self::relaxed()),
            other => Err(JanitorError::Config(format!(
                "unknown preset '{}' (expected default, frequent or relaxed)",
                other
            ))),
        }
    }

    /// Check the configuration can drive a worker
    pub fn validate(&self) -> Result<(), JanitorError> {
        if self.sweep_interval_minutes == 0 {
            return Err(JanitorError::Config(
                "sweep_interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }
}

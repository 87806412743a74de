//! Tether Janitor
//!
//! Background maintenance for a Tether store.
//!
//! # Overview
//!
//! Interaction scores decay with wall-clock time, so a score written when
//! the last interaction was logged drifts out of date. The Janitor keeps a
//! store tidy between interactive sessions:
//! - **Score recomputation**: rescoring every entity under the current decay settings
//! - **Tag reconciliation**: resetting tag counts from the entity links and dropping unused tags
//! - **Contact repair**: replacing unreadable contact data with an empty record
//! - **Metrics collection**: tracking what each sweep touched
//!
//! # Usage
//!
//! ## One-time Sweep
//!
//! ```no_run
//! use tether_janitor::Janitor;
//! use tether_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::new("tether.db")?;
//! let mut janitor = Janitor::default_config();
//!
//! let metrics = janitor.sweep(&mut store)?;
//! println!("{}", metrics.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use tether_janitor::JanitorConfig;
//!
//! // Default: every task, hourly
//! let config = JanitorConfig::default();
//!
//! // Frequent: every task, every 15 minutes
//! let config = JanitorConfig::frequent();
//!
//! // Relaxed: scores only, every 6 hours
//! let config = JanitorConfig::relaxed();
//! ```
//!
//! # Configuration
//!
//! The Janitor can be configured via TOML:
//!
//! ```toml
//! [janitor]
//! sweep_interval_minutes = 60
//! recompute_scores = true
//! reconcile_tags = true
//! repair_contacts = true
//! dry_run = false
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod janitor;
mod metrics;
mod worker;

pub use config::JanitorConfig;
pub use error::JanitorError;
pub use janitor::Janitor;
pub use metrics::{JanitorMetrics, MaintenanceTask};
pub use worker::JanitorWorker;

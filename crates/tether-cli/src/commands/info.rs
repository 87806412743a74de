//! Info command implementation.

use std::path::Path;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::Formatter;
use serde_json::json;
use tether_store::{migrations, SqliteStore};

/// Execute the info command.
pub fn execute_info(store: &SqliteStore, database: &Path, formatter: &Formatter) -> Result<()> {
    let version = store.schema_version()?;
    let latest = migrations::latest_version();
    let report = store.migration_report();
    let complete = store.capabilities().is_complete();

    match formatter.format() {
        OutputFormat::Json => {
            let value = json!({
                "database": database.display().to_string(),
                "schema_version": version,
                "latest_version": latest,
                "applied": report.applied,
                "failed": report.failed.iter().map(|(v, e)| json!({ "version": v, "error": e })).collect::<Vec<_>>(),
                "complete": complete,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Quiet => println!("{}", version),
        OutputFormat::Table => {
            println!("Database:       {}", database.display());
            println!("Schema version: {} of {}", version, latest);
            println!("Migrations:\n{}", formatter.migration_report(report));
            if !complete {
                println!(
                    "{}",
                    formatter.warning("Schema is incomplete; backups are unavailable until migrations succeed")
                );
            }
        }
    }
    Ok(())
}

//! Janitor command implementation.

use crate::cli::JanitorArgs;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::Formatter;
use tether_janitor::{Janitor, JanitorConfig, JanitorMetrics, JanitorWorker};
use tether_store::SqliteStore;

/// Configuration the janitor runs with: a named preset or the config file
/// section, with dry-run forced on by the flag.
pub fn resolve_config(args: &JanitorArgs, configured: &JanitorConfig) -> Result<JanitorConfig> {
    let mut config = match &args.preset {
        Some(name) => JanitorConfig::preset(name)?,
        None => configured.clone(),
    };
    if args.dry_run {
        config.dry_run = true;
    }
    config.validate()?;
    Ok(config)
}

fn print_metrics(metrics: &JanitorMetrics, formatter: &Formatter) {
    match formatter.format() {
        OutputFormat::Quiet => println!("{}", metrics.total_repairs()),
        _ => println!("{}", metrics.summary()),
    }
}

/// Execute the janitor command.
///
/// With `--once` a single sweep runs; otherwise the worker sweeps on its
/// interval until Ctrl+C.
pub async fn execute_janitor(
    args: JanitorArgs,
    mut store: SqliteStore,
    configured: &JanitorConfig,
    formatter: &Formatter,
) -> Result<()> {
    let config = resolve_config(&args, configured)?;

    if args.once {
        let mut janitor = Janitor::new(config);
        let metrics = janitor.sweep(&mut store)?;
        print_metrics(&metrics, formatter);
        return Ok(());
    }

    if formatter.format() != OutputFormat::Quiet {
        println!(
            "{}",
            formatter.info(&format!(
                "Sweeping every {} minute(s); press Ctrl+C to stop",
                config.sweep_interval_minutes
            ))
        );
    }
    let mut worker = JanitorWorker::new(config);
    worker.run(store).await?;
    print_metrics(worker.metrics(), formatter);
    Ok(())
}

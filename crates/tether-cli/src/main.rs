//! Tether CLI - Command-line interface for the Tether relationship tracker.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tether_cli::commands;
use tether_cli::{logging, Cli, CliError, Command, Config, Formatter};
use tether_store::SqliteStore;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> tether_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load or create config
    let config_path = match &cli.config {
        Some(path) => PathBuf::from(path),
        None => Config::path()?,
    };
    let mut config = if config_path.exists() {
        Config::load_from(&config_path)?
    } else {
        let cfg = Config::default();
        cfg.save_to(&config_path).ok();
        cfg
    };

    logging::init(&config.settings.log_level);

    // Override profile for this invocation only
    if let Some(profile_name) = cli.profile {
        config.switch_profile(profile_name)?;
    }

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    if !cli.command.needs_store() {
        return match cli.command {
            Command::Profile(args) => commands::execute_profile(args, &mut config, &config_path, &formatter),
            Command::Passphrase => commands::execute_passphrase(&formatter),
            _ => Err(CliError::Config("command requires a database".to_string())),
        };
    }

    // Commands that require a store
    let profile = config.get_active_profile()?.clone();
    let database = profile.database_path();
    if let Some(parent) = database.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut store = SqliteStore::new(&database)?;
    if let Some(dir) = profile.photo_dir_path() {
        store = store.with_photo_dir(dir);
    }
    tracing::debug!(database = %database.display(), profile = %config.active_profile, "Store opened");

    match cli.command {
        Command::Add(args) => {
            commands::execute_add(args, &mut store, &formatter)?;
        }
        Command::Show { id } => commands::execute_show(id, &mut store, &formatter)?,
        Command::List(args) => commands::execute_list(args, &mut store, &formatter)?,
        Command::Search(args) => commands::execute_search(args, &mut store, &formatter)?,
        Command::Update(args) => commands::execute_update(args, &mut store, &formatter)?,
        Command::Delete { id, yes } => commands::execute_delete(id, yes, &mut store, &formatter)?,
        Command::Merge(args) => commands::execute_merge(args, &mut store, &formatter)?,
        Command::Log(args) => {
            commands::execute_log(args, &mut store, &formatter)?;
        }
        Command::History { id, limit } => commands::execute_history(id, limit, &mut store, &formatter)?,
        Command::Interaction(args) => commands::execute_interaction(args, &mut store, &formatter)?,
        Command::Activity(args) => commands::execute_activity(args, &mut store, &formatter)?,
        Command::Tag(args) => commands::execute_tag(args, &mut store, &formatter)?,
        Command::Types(args) => commands::execute_types(args, &mut store, &formatter)?,
        Command::Group(args) => commands::execute_group(args, &mut store, &formatter)?,
        Command::Favorite(args) => commands::execute_favorite(args, &mut store, &formatter)?,
        Command::Photo(args) => commands::execute_photo(args, &mut store, &formatter)?,
        Command::Settings(args) => commands::execute_settings(args, &mut store, &formatter)?,
        Command::Export(args) => commands::execute_export(args, &store, &formatter)?,
        Command::Import(args) => commands::execute_import(args, &mut store, &formatter)?,
        Command::Info => commands::execute_info(&store, &database, &formatter)?,
        Command::Janitor(args) => {
            commands::execute_janitor(args, store, &config.janitor, &formatter).await?;
        }
        Command::Profile(_) | Command::Passphrase => unreachable!("handled without a store"),
    }

    Ok(())
}

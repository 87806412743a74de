//! Profile command implementation.

use std::path::Path;

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::{Config, Profile};
use crate::error::Result;
use crate::output::Formatter;

/// Execute the profile command, saving changes to `config_path`.
pub fn execute_profile(
    args: ProfileArgs,
    config: &mut Config,
    config_path: &Path,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Switch { name } => switch_profile(config, config_path, name, formatter),
        ProfileAction::Set {
            name,
            database,
            photo_dir,
        } => set_profile(config, config_path, name, database, photo_dir, formatter),
        ProfileAction::Delete { name } => delete_profile(config, config_path, name, formatter),
    }
}

fn print_profile(profile: &Profile, indent: &str) {
    println!("{}Database: {}", indent, profile.database);
    if let Some(dir) = &profile.photo_dir {
        println!("{}Photos:   {}", indent, dir);
    }
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    println!("Available profiles:");
    for name in config.profile_names() {
        let active = name == config.active_profile;
        let marker = if active { "* " } else { "  " };
        println!(
            "{}{}",
            marker,
            if active {
                formatter.success(name)
            } else {
                name.to_string()
            }
        );
        if let Some(profile) = config.profiles.get(name) {
            print_profile(profile, "    ");
        }
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;

    println!("Active profile: {}", formatter.success(&config.active_profile));
    print_profile(profile, "  ");

    Ok(())
}

/// Switch to a different profile.
fn switch_profile(config: &mut Config, config_path: &Path, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    config.save_to(config_path)?;
    println!(
        "{}",
        formatter.success(&format!("Switched to profile '{}'", name))
    );
    Ok(())
}

/// Create or update a profile.
fn set_profile(
    config: &mut Config,
    config_path: &Path,
    name: String,
    database: String,
    photo_dir: Option<String>,
    formatter: &Formatter,
) -> Result<()> {
    let profile = Profile { database, photo_dir };

    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };

    config.set_profile(name.clone(), profile);
    config.save_to(config_path)?;

    println!(
        "{}",
        formatter.success(&format!("{} profile '{}'", action, name))
    );

    Ok(())
}

/// Delete a profile.
fn delete_profile(config: &mut Config, config_path: &Path, name: String, formatter: &Formatter) -> Result<()> {
    if name == config.active_profile {
        return Err(crate::error::CliError::NotPermitted(
            "Cannot delete the active profile".to_string(),
        ));
    }

    if config.profiles.remove(&name).is_some() {
        config.save_to(config_path)?;
        println!(
            "{}",
            formatter.success(&format!("Deleted profile '{}'", name))
        );
    } else {
        println!(
            "{}",
            formatter.warning(&format!("Profile '{}' does not exist", name))
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_set_and_switch_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        let formatter = Formatter::new(OutputFormat::Table, false);

        set_profile(
            &mut config,
            &path,
            "work".to_string(),
            "/data/work.db".to_string(),
            None,
            &formatter,
        )
        .unwrap();

        assert!(config.profiles.contains_key("work"));

        switch_profile(&mut config, &path, "work".to_string(), &formatter).unwrap();
        assert_eq!(config.active_profile, "work");

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.active_profile, "work");
        assert_eq!(saved.profiles["work"].database, "/data/work.db");
    }

    #[test]
    fn test_delete_active_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let formatter = Formatter::new(OutputFormat::Table, false);

        let result = delete_profile(&mut config, &dir.path().join("config.toml"), "default".to_string(), &formatter);
        assert!(result.is_err());
    }
}

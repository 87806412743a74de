//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tether_janitor::JanitorConfig;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name
    #[serde(default = "default_profile")]
    pub active_profile: String,

    /// Available profiles
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Maintenance worker settings
    #[serde(default)]
    pub janitor: JanitorConfig,
}

/// Database profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// SQLite database file (a leading `~/` is the home directory)
    pub database: String,

    /// Directory photo files are restored into on import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_dir: Option<String>,
}

impl Profile {
    /// Database path with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        expand_home(&self.database)
    }

    /// Photo directory with `~` expanded
    pub fn photo_dir_path(&self) -> Option<PathBuf> {
        self.photo_dir.as_deref().map(expand_home)
    }
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Log filter used when `TETHER_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".tether").join("config.toml"))
    }

    /// Load configuration from the default path or create default.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from a file, or the default if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the active profile.
    pub fn get_active_profile(&self) -> Result<&Profile> {
        self.profiles
            .get(&self.active_profile)
            .ok_or_else(|| CliError::Config(format!("Profile '{}' not found", self.active_profile)))
    }

    /// Add or update a profile.
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Switch to a different profile.
    pub fn switch_profile(&mut self, name: String) -> Result<()> {
        if !self.profiles.contains_key(&name) {
            return Err(CliError::Config(format!("Profile '{}' does not exist", name)));
        }
        self.active_profile = name;
        Ok(())
    }

    /// Profile names in alphabetical order
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "default".to_string(),
            Profile {
                database: "~/.tether/tether.db".to_string(),
                photo_dir: Some("~/.tether/photos".to_string()),
            },
        );

        Self {
            active_profile: "default".to_string(),
            profiles,
            settings: Settings::default(),
            janitor: JanitorConfig::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            log_level: default_log_level(),
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_log_level() -> String {
    "warn".to_string()
}

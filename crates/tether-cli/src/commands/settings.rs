//! Decay settings command implementation.

use crate::cli::{SettingsAction, SettingsArgs};
use crate::config::OutputFormat;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tether_store::SqliteStore;

/// Execute the settings command.
pub fn execute_settings(args: SettingsArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        SettingsAction::Show => {
            println!("{}", formatter.format_settings(&store.settings()?)?);
        }
        SettingsAction::Set { factor, decay } => {
            if factor.is_none() && decay.is_none() {
                return Err(CliError::InvalidInput(
                    "Give --factor, --decay or both".to_string(),
                ));
            }
            let mut settings = store.settings()?;
            if let Some(factor) = factor {
                settings.decay_factor = factor;
            }
            if let Some(decay) = decay {
                settings.decay_type = decay;
            }

            let recomputed = store.update_settings(settings)?;
            match formatter.format() {
                OutputFormat::Table => println!(
                    "{}",
                    formatter.success(&format!(
                        "Decay set to {} at {} per day; {} score(s) recomputed",
                        settings.decay_type, settings.decay_factor, recomputed
                    ))
                ),
                _ => println!("{}", formatter.format_settings(&settings)?),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_domain::DecayType;

    #[test]
    fn test_set_keeps_unspecified_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let set = SettingsArgs { action: SettingsAction::Set { factor: Some(0.05), decay: None } };
        execute_settings(set, &mut store, &formatter).unwrap();
        let set = SettingsArgs {
            action: SettingsAction::Set { factor: None, decay: Some(DecayType::Exponential) },
        };
        execute_settings(set, &mut store, &formatter).unwrap();

        let settings = store.settings().unwrap();
        assert_eq!(settings.decay_factor, 0.05);
        assert_eq!(settings.decay_type, DecayType::Exponential);
    }

    #[test]
    fn test_invalid_settings() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let empty = SettingsArgs { action: SettingsAction::Set { factor: None, decay: None } };
        assert!(matches!(execute_settings(empty, &mut store, &formatter), Err(CliError::InvalidInput(_))));

        let negative = SettingsArgs { action: SettingsAction::Set { factor: Some(-1.0), decay: None } };
        assert!(execute_settings(negative, &mut store, &formatter).is_err());
        assert_eq!(store.settings().unwrap().decay_factor, 0.0);
    }
}

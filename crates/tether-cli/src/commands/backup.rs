//! Backup command implementations.

use std::fs;

use crate::cli::{ExportArgs, ImportArgs};
use crate::commands::confirm;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::Formatter;
use tether_store::{generate_passphrase, SqliteStore};

/// Execute the export command.
///
/// Without a passphrase the backup is plain JSON.
pub fn execute_export(args: ExportArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let backup = store.export_backup(args.passphrase.as_deref())?;

    match &args.output {
        Some(path) => {
            fs::write(path, &backup)?;
            if formatter.format() != OutputFormat::Quiet {
                let kind = if args.passphrase.is_some() { "Encrypted" } else { "Unencrypted" };
                println!("{}", formatter.success(&format!("{} backup written to {}", kind, path)));
                if args.passphrase.is_none() {
                    println!(
                        "{}",
                        formatter.warning("Anyone with this file can read it; pass --passphrase to encrypt")
                    );
                }
            }
        }
        None => println!("{}", backup),
    }
    Ok(())
}

/// Execute the import command.
pub fn execute_import(args: ImportArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let input = fs::read_to_string(&args.file)?;

    if !args.yes && !confirm("Importing replaces everything in this database. Continue?")? {
        println!("{}", formatter.info("Operation cancelled"));
        return Ok(());
    }

    let summary = store.import_backup(&input, args.passphrase.as_deref())?;
    match formatter.format() {
        OutputFormat::Quiet => println!("{}", summary.entities),
        _ => println!("{}", formatter.import_result(&summary)),
    }
    Ok(())
}

/// Execute the passphrase command.
pub fn execute_passphrase(formatter: &Formatter) -> Result<()> {
    let passphrase = generate_passphrase();
    match formatter.format() {
        OutputFormat::Table => {
            println!("{}", passphrase);
            println!(
                "{}",
                formatter.info("Write this down. A backup encrypted with it cannot be opened without it.")
            );
        }
        _ => println!("{}", passphrase),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use tether_domain::{EntityType, NewEntity};
    use tether_store::StoreError;

    const PASSPHRASE: &str = "amber falcon meadow copper willow harbor";

    #[test]
    fn test_encrypted_export_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let mut source = SqliteStore::open_in_memory().unwrap();
        let alice = source.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();
        source.record_interaction(alice, "General", None, Some("coffee")).unwrap();

        let export = ExportArgs {
            output: Some(path.to_string_lossy().into_owned()),
            passphrase: Some(PASSPHRASE.to_string()),
        };
        execute_export(export, &source, &formatter).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("Alice"));

        let mut target = SqliteStore::open_in_memory().unwrap();
        let wrong = ImportArgs {
            file: path.to_string_lossy().into_owned(),
            passphrase: Some("amber falcon meadow copper willow anchor".to_string()),
            yes: true,
        };
        assert!(matches!(
            execute_import(wrong, &mut target, &formatter),
            Err(CliError::Store(StoreError::Integrity))
        ));

        let import = ImportArgs {
            file: path.to_string_lossy().into_owned(),
            passphrase: Some(PASSPHRASE.to_string()),
            yes: true,
        };
        execute_import(import, &mut target, &formatter).unwrap();
        let restored = target.get_entity(alice).unwrap().unwrap();
        assert_eq!(restored.name, "Alice");
        assert_eq!(target.interaction_logs(alice, None).unwrap().len(), 1);
    }

    #[test]
    fn test_weak_passphrase_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let export = ExportArgs {
            output: Some(path.to_string_lossy().into_owned()),
            passphrase: Some("hunter2".to_string()),
        };
        assert!(matches!(
            execute_export(export, &store, &formatter),
            Err(CliError::Store(StoreError::InvalidPassphrase(_)))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_backup_file() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let import = ImportArgs { file: "/nonexistent/backup.json".to_string(), passphrase: None, yes: true };
        assert!(matches!(execute_import(import, &mut store, &formatter), Err(CliError::Io(_))));
    }
}

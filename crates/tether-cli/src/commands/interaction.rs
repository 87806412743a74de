//! Interaction command implementations.

use crate::cli::{ActivityArgs, BucketArg, InteractionAction, InteractionArgs, LogArgs};
use crate::commands::{report, require_entity};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::time::parse_timestamp;
use tether_domain::{EntityId, InteractionEdit, InteractionId};
use tether_store::SqliteStore;

/// Execute the log command.
pub fn execute_log(args: LogArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<InteractionId> {
    let timestamp = args.at.as_deref().map(parse_timestamp).transpose()?;
    let entity = require_entity(store, args.id)?;
    let members = if entity.is_group() {
        store.group_members(args.id)?.len()
    } else {
        0
    };

    let id = store.record_interaction(args.id, &args.kind, timestamp, args.notes.as_deref())?;
    let score = require_entity(store, args.id)?.interaction_score;

    let mut message = format!("Logged {} with '{}' (score {:.2})", args.kind, entity.name, score);
    if members > 0 {
        message.push_str(&format!(", also recorded for {} member(s)", members));
    }
    report(formatter, id, &message);
    Ok(id)
}

/// Execute the history command.
pub fn execute_history(
    id: EntityId,
    limit: Option<usize>,
    store: &mut SqliteStore,
    formatter: &Formatter,
) -> Result<()> {
    let logs = store.interaction_logs(id, limit)?;
    let colors = logs
        .iter()
        .map(|i| store.interaction_color(i))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    println!("{}", formatter.format_interactions(&logs, &colors)?);
    Ok(())
}

/// Execute the interaction command.
pub fn execute_interaction(args: InteractionArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        InteractionAction::Edit {
            id,
            kind,
            notes,
            clear_notes,
            at,
        } => {
            let edit = InteractionEdit {
                timestamp: at.as_deref().map(parse_timestamp).transpose()?,
                type_name: kind,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
            };
            if edit.timestamp.is_none() && edit.type_name.is_none() && edit.notes.is_none() {
                return Err(CliError::InvalidInput("Nothing to change".to_string()));
            }
            let updated = store.edit_interaction(id, edit)?;
            report(
                formatter,
                id,
                &format!("Updated interaction {} ({})", id, updated.type_name),
            );
        }
        InteractionAction::Delete { id } => {
            store.delete_interaction(id)?;
            report(formatter, id, &format!("Deleted interaction {}", id));
        }
    }
    Ok(())
}

/// Execute the activity command.
pub fn execute_activity(args: ActivityArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    if let Some(id) = args.entity {
        require_entity(store, id)?;
    }
    let buckets = match args.by {
        BucketArg::Day => store.interaction_counts_by_day(args.entity)?,
        BucketArg::Month => store.interaction_counts_by_month(args.entity)?,
    };
    println!("{}", formatter.format_buckets(&buckets)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tether_domain::{EntityType, NewEntity};

    fn quiet() -> Formatter {
        Formatter::new(OutputFormat::Quiet, false)
    }

    fn log_args(id: EntityId, kind: &str, at: Option<&str>) -> LogArgs {
        LogArgs {
            id,
            kind: kind.to_string(),
            notes: Some("lunch downtown".to_string()),
            at: at.map(str::to_string),
        }
    }

    #[test]
    fn test_log_with_date() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();

        execute_log(log_args(id, "General", Some("2024-01-15 18:00")), &mut store, &quiet()).unwrap();

        let logs = store.interaction_logs(id, None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].timestamp, 1_705_341_600_000);
        assert_eq!(logs[0].notes.as_deref(), Some("lunch downtown"));
    }

    #[test]
    fn test_log_rejects_bad_date() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();

        let result = execute_log(log_args(id, "General", Some("next tuesday")), &mut store, &quiet());
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
        assert!(store.interaction_logs(id, None).unwrap().is_empty());
    }

    #[test]
    fn test_log_group_fans_out() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let group = store.create_entity(NewEntity::new("Book Club", EntityType::Group)).unwrap();
        let member = store.create_entity(NewEntity::new("Bob", EntityType::Person)).unwrap();
        store.add_group_member(group, member).unwrap();

        execute_log(log_args(group, "General", None), &mut store, &quiet()).unwrap();
        assert_eq!(store.interaction_logs(member, None).unwrap().len(), 1);
    }

    #[test]
    fn test_edit_and_delete() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();
        let interaction = execute_log(log_args(id, "General", None), &mut store, &quiet()).unwrap();

        let edit = InteractionArgs {
            action: InteractionAction::Edit {
                id: interaction,
                kind: None,
                notes: None,
                clear_notes: true,
                at: Some("2024-01-01".to_string()),
            },
        };
        execute_interaction(edit, &mut store, &quiet()).unwrap();
        let logs = store.interaction_logs(id, None).unwrap();
        assert!(logs[0].notes.is_none());
        assert_eq!(logs[0].timestamp, 1_704_067_200_000);

        let empty = InteractionArgs {
            action: InteractionAction::Edit {
                id: interaction,
                kind: None,
                notes: None,
                clear_notes: false,
                at: None,
            },
        };
        assert!(execute_interaction(empty, &mut store, &quiet()).is_err());

        let delete = InteractionArgs { action: InteractionAction::Delete { id: interaction } };
        execute_interaction(delete, &mut store, &quiet()).unwrap();
        assert!(store.interaction_logs(id, None).unwrap().is_empty());
        assert_eq!(store.get_entity(id).unwrap().unwrap().interaction_score, 0.0);
    }

    #[test]
    fn test_history_and_activity_run() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();
        execute_log(log_args(id, "General", Some("2024-02-01")), &mut store, &quiet()).unwrap();

        execute_history(id, Some(10), &mut store, &quiet()).unwrap();
        let activity = ActivityArgs { entity: Some(id), by: BucketArg::Day };
        execute_activity(activity, &mut store, &quiet()).unwrap();

        let missing = ActivityArgs { entity: Some(EntityId::from_value(999)), by: BucketArg::Month };
        assert!(matches!(execute_activity(missing, &mut store, &quiet()), Err(CliError::NotFound(_))));
    }
}

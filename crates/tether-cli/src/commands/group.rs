//! Group membership and favorite command implementations.

use crate::cli::{FavoriteAction, FavoriteArgs, GroupAction, GroupArgs};
use crate::commands::{report, require_entity};
use crate::error::Result;
use crate::output::Formatter;
use tether_store::SqliteStore;

/// Execute the group command.
pub fn execute_group(args: GroupArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        GroupAction::Add { group, member } => {
            if store.add_group_member(group, member)? {
                report(formatter, member, &format!("Added entity {} to group {}", member, group));
            } else {
                println!("{}", formatter.info("Already a member"));
            }
        }
        GroupAction::Remove { group, member } => {
            if store.remove_group_member(group, member)? {
                report(formatter, member, &format!("Removed entity {} from group {}", member, group));
            } else {
                println!("{}", formatter.warning("Not a member"));
            }
        }
        GroupAction::Members { group } => {
            let members = store.group_members(group)?;
            println!("{}", formatter.format_entities(&members)?);
        }
        GroupAction::Of { member } => {
            let groups = store.groups_of(member)?;
            println!("{}", formatter.format_entities(&groups)?);
        }
    }
    Ok(())
}

/// Execute the favorite command.
pub fn execute_favorite(args: FavoriteArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        FavoriteAction::Toggle { id } => {
            let entity = require_entity(store, id)?;
            let pinned = store.toggle_favorite(id)?;
            let message = if pinned {
                format!("'{}' is now a favorite", entity.name)
            } else {
                format!("'{}' is no longer a favorite", entity.name)
            };
            report(formatter, id, &message);
        }
        FavoriteAction::List => {
            let favorites = store.favorites()?;
            println!("{}", formatter.format_entities(&favorites)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::CliError;
    use tether_domain::{EntityType, NewEntity};
    use tether_store::StoreError;

    #[test]
    fn test_membership() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let group = store.create_entity(NewEntity::new("Book Club", EntityType::Group)).unwrap();
        let bob = store.create_entity(NewEntity::new("Bob", EntityType::Person)).unwrap();

        let add = GroupArgs { action: GroupAction::Add { group, member: bob } };
        execute_group(add, &mut store, &formatter).unwrap();
        assert_eq!(store.group_members(group).unwrap().len(), 1);

        let wrong = GroupArgs { action: GroupAction::Add { group: bob, member: group } };
        assert!(matches!(
            execute_group(wrong, &mut store, &formatter),
            Err(CliError::Store(StoreError::NotAGroup(_)))
        ));

        let remove = GroupArgs { action: GroupAction::Remove { group, member: bob } };
        execute_group(remove, &mut store, &formatter).unwrap();
        assert!(store.groups_of(bob).unwrap().is_empty());
    }

    #[test]
    fn test_favorite_toggle() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();

        execute_favorite(FavoriteArgs { action: FavoriteAction::Toggle { id } }, &mut store, &formatter).unwrap();
        assert!(store.is_favorite(id).unwrap());
        execute_favorite(FavoriteArgs { action: FavoriteAction::Toggle { id } }, &mut store, &formatter).unwrap();
        assert!(!store.is_favorite(id).unwrap());

        execute_favorite(FavoriteArgs { action: FavoriteAction::List }, &mut store, &formatter).unwrap();
    }
}

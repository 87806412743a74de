//! Tag command implementations.

use crate::cli::{TagAction, TagArgs};
use crate::commands::{report, require_entity};
use crate::error::Result;
use crate::output::Formatter;
use tether_store::SqliteStore;

/// Execute the tag command.
pub fn execute_tag(args: TagArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        TagAction::Add { entity, name } => {
            let is_new = store.find_tag_by_name(&name)?.is_none();
            let tag_id = store.add_tag_to_entity(entity, &name)?;
            let mut message = format!("Tagged entity {} with '{}'", entity, name.trim());
            if is_new {
                let offered = store.entity_interaction_types(entity)?.len();
                message.push_str(&format!(" ({} interaction types now offered)", offered));
            }
            report(formatter, tag_id, &message);
        }
        TagAction::Remove { entity, name } => {
            if store.remove_tag_from_entity(entity, &name)? {
                report(formatter, entity, &format!("Removed '{}' from entity {}", name.trim(), entity));
            } else {
                println!(
                    "{}",
                    formatter.warning(&format!("Entity {} is not tagged '{}'", entity, name.trim()))
                );
            }
        }
        TagAction::List { entity } => {
            let tags = match entity {
                Some(id) => {
                    require_entity(store, id)?;
                    store.entity_tags(id)?
                }
                None => store.list_tags()?,
            };
            println!("{}", formatter.format_tags(&tags)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tether_domain::{EntityType, NewEntity};

    #[test]
    fn test_add_remove_tag() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();

        let add = TagArgs { action: TagAction::Add { entity: id, name: "Family".to_string() } };
        execute_tag(add, &mut store, &formatter).unwrap();
        assert_eq!(store.find_tag_by_name("family").unwrap().unwrap().count, 1);

        let remove = TagArgs { action: TagAction::Remove { entity: id, name: "family".to_string() } };
        execute_tag(remove, &mut store, &formatter).unwrap();
        assert!(store.entity_tags(id).unwrap().is_empty());

        // Removing again only warns
        let remove = TagArgs { action: TagAction::Remove { entity: id, name: "family".to_string() } };
        execute_tag(remove, &mut store, &formatter).unwrap();

        let list = TagArgs { action: TagAction::List { entity: None } };
        execute_tag(list, &mut store, &formatter).unwrap();
    }
}

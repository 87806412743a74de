//! Interaction type command implementations.

use crate::cli::{TypeFields, TypesAction, TypesArgs};
use crate::commands::{report, require_entity};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tether_domain::{InteractionTypeTemplate, TagId};
use tether_store::SqliteStore;

fn template_from(name: &str, fields: &TypeFields) -> InteractionTypeTemplate {
    InteractionTypeTemplate::new(name.trim(), fields.icon.clone())
        .with_score(fields.score)
        .with_color(fields.color.clone())
        .restricted_to(&fields.only)
}

fn resolve_tag(store: &SqliteStore, name: &str) -> Result<TagId> {
    store
        .find_tag_by_name(name)?
        .map(|tag| tag.id)
        .ok_or_else(|| CliError::NotFound(format!("tag '{}'", name.trim())))
}

/// Execute the types command.
pub fn execute_types(args: TypesArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        TypesAction::List { entity } => {
            let types = match entity {
                Some(id) => {
                    require_entity(store, id)?;
                    store.entity_interaction_types(id)?
                }
                None => store.list_interaction_types()?,
            };
            println!("{}", formatter.format_interaction_types(&types)?);
        }
        TypesAction::Create { name, fields, tags } => {
            let tag_ids = tags
                .iter()
                .map(|tag| resolve_tag(store, tag))
                .collect::<Result<Vec<_>>>()?;
            let id = store.create_interaction_type(&template_from(&name, &fields), &tag_ids)?;
            report(formatter, id, &format!("Created interaction type '{}' (id {})", name.trim(), id));
        }
        TypesAction::Update { id, name, fields } => {
            store.update_interaction_type(id, &template_from(&name, &fields))?;
            report(formatter, id, &format!("Updated interaction type {}", id));
        }
        TypesAction::Delete { id } => {
            store.delete_interaction_type(id)?;
            report(formatter, id, &format!("Deleted interaction type {}", id));
        }
        TypesAction::Link { id, tag } => {
            let tag_id = resolve_tag(store, &tag)?;
            if store.link_interaction_type_tag(id, tag_id)? {
                report(formatter, id, &format!("Linked interaction type {} to '{}'", id, tag.trim()));
            } else {
                println!("{}", formatter.info("Already linked"));
            }
        }
        TypesAction::Unlink { id, tag } => {
            let tag_id = resolve_tag(store, &tag)?;
            if store.unlink_interaction_type_tag(id, tag_id)? {
                report(formatter, id, &format!("Unlinked interaction type {} from '{}'", id, tag.trim()));
            } else {
                println!("{}", formatter.info("Not linked"));
            }
        }
    }
    Ok(())
}

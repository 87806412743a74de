//! Entity command implementations.

use crate::cli::{AddArgs, ListArgs, MergeArgs, SearchArgs, UpdateArgs};
use crate::commands::{confirm, report, require_entity};
use crate::error::{CliError, Result};
use crate::output::{EntityDetail, Formatter};
use tether_domain::{
    ContactData, EmailAddress, EntityId, EntityType, EntityUpdate, ListOptions, NewEntity,
    PhoneNumber,
};
use tether_store::SqliteStore;

/// Contact data from the add flags, if any were given.
fn contact_from_args(args: &AddArgs) -> Option<ContactData> {
    if args.phones.is_empty() && args.emails.is_empty() && args.birthday.is_none() {
        return None;
    }
    Some(ContactData {
        phone_numbers: args.phones.iter().map(PhoneNumber::new).collect(),
        emails: args.emails.iter().map(EmailAddress::new).collect(),
        birthday: args.birthday.clone(),
        ..Default::default()
    })
}

/// Execute the add command.
pub fn execute_add(args: AddArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<EntityId> {
    let contact = contact_from_args(&args);
    if contact.is_some() && args.entity_type != EntityType::Person {
        return Err(CliError::InvalidInput(
            "Phone numbers, emails and birthdays can only be recorded for a person".to_string(),
        ));
    }

    let existing = store.find_duplicates(
        args.entity_type,
        args.name.trim(),
        args.details.as_deref(),
        contact.as_ref(),
    )?;

    let mut input = NewEntity::new(args.name.clone(), args.entity_type);
    if let Some(details) = &args.details {
        input = input.with_details(details.clone());
    }
    if let Some(image) = &args.image {
        input = input.with_image(image.clone());
    }
    if let Some(contact) = contact {
        input = input.with_contact(contact);
    }
    let id = store.create_entity(input)?;

    for tag in &args.tags {
        store.add_tag_to_entity(id, tag)?;
    }

    if existing == Some(id) {
        println!(
            "{}",
            formatter.warning(&format!("'{}' is already tracked as entity {}", args.name.trim(), id))
        );
    } else {
        report(
            formatter,
            id,
            &format!("Added {} '{}' (id {})", args.entity_type, args.name.trim(), id),
        );
    }
    Ok(id)
}

/// Gather everything shown about one entity.
pub fn load_detail(store: &mut SqliteStore, id: EntityId) -> Result<EntityDetail> {
    let entity = require_entity(store, id)?;
    let contact = store.contact_data(id)?;
    let tags = store.entity_tags(id)?;
    let groups = store.groups_of(id)?;
    let members = if entity.is_group() {
        store.group_members(id)?
    } else {
        Vec::new()
    };
    let favorite = store.is_favorite(id)?;
    let photos = store.photos(id)?;

    Ok(EntityDetail {
        entity,
        contact,
        tags,
        groups,
        members,
        favorite,
        photos,
    })
}

/// Execute the show command.
pub fn execute_show(id: EntityId, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let detail = load_detail(store, id)?;
    println!("{}", formatter.format_entity_detail(&detail)?);
    Ok(())
}

/// Execute the list command.
pub fn execute_list(args: ListArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let options = ListOptions {
        entity_type: args.entity_type,
        sort: args.sort.into(),
        favorites_first: args.favorites_first,
        limit: args.limit,
    };
    let entities = store.list_entities(&options)?;
    println!("{}", formatter.format_entities(&entities)?);
    Ok(())
}

/// Execute the search command.
pub fn execute_search(args: SearchArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let found = store.search_entities(&args.term, args.entity_type)?;
    println!("{}", formatter.format_entities(&found)?);
    Ok(())
}

/// Build a partial update from the update flags.
fn update_from_args(args: &UpdateArgs) -> EntityUpdate {
    let details = if args.clear_details {
        Some(None)
    } else {
        args.details.clone().map(Some)
    };
    let image = if args.clear_image {
        Some(None)
    } else {
        args.image.clone().map(Some)
    };

    EntityUpdate {
        name: args.name.clone(),
        details,
        image,
        contact: None,
    }
}

/// Execute the update command.
pub fn execute_update(args: UpdateArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let update = update_from_args(&args);
    if update.is_empty() {
        return Err(CliError::InvalidInput("Nothing to update".to_string()));
    }
    store.update_entity(args.id, update)?;
    report(formatter, args.id, &format!("Updated entity {}", args.id));
    Ok(())
}

/// Execute the delete command.
pub fn execute_delete(id: EntityId, yes: bool, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    let entity = require_entity(store, id)?;

    if !yes && !confirm(&format!(
        "Delete {} '{}' with all of its interactions and photos?",
        entity.entity_type, entity.name
    ))? {
        println!("{}", formatter.info("Operation cancelled"));
        return Ok(());
    }

    store.delete_entity(id)?;
    report(formatter, id, &format!("Deleted '{}'", entity.name));
    Ok(())
}

/// Execute the merge command.
pub fn execute_merge(args: MergeArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    if args.source == args.target {
        return Err(CliError::InvalidInput("Cannot merge an entity into itself".to_string()));
    }
    let source = require_entity(store, args.source)?;
    let target = require_entity(store, args.target)?;

    if !args.yes && !confirm(&format!(
        "Merge '{}' ({}) into '{}' ({})? '{}' will be deleted.",
        source.name, source.id, target.name, target.id, source.name
    ))? {
        println!("{}", formatter.info("Operation cancelled"));
        return Ok(());
    }

    let summary = store.merge_entities(args.source, args.target)?;
    match formatter.format() {
        crate::config::OutputFormat::Quiet => println!("{}", args.target),
        _ => println!("{}", formatter.merge_result(&summary)),
    }
    Ok(())
}

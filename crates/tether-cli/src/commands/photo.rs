//! Photo command implementations.

use crate::cli::{PhotoAction, PhotoArgs};
use crate::commands::report;
use crate::error::Result;
use crate::output::Formatter;
use tether_store::SqliteStore;

/// Execute the photo command.
pub fn execute_photo(args: PhotoArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        PhotoAction::Add { entity, uri, caption } => {
            let id = store.add_photo(entity, &uri, caption.as_deref(), None)?;
            report(formatter, id, &format!("Attached photo {} to entity {}", id, entity));
        }
        PhotoAction::List { entity } => {
            let photos = store.photos(entity)?;
            println!("{}", formatter.format_photos(&photos)?);
        }
        PhotoAction::Delete { id } => {
            if store.delete_photo(id)? {
                report(formatter, id, &format!("Deleted photo {}", id));
            } else {
                println!("{}", formatter.warning(&format!("Photo {} does not exist", id)));
            }
        }
    }
    Ok(())
}

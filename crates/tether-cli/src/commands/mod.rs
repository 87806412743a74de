//! Command implementations.

pub mod backup;
pub mod entity;
pub mod group;
pub mod info;
pub mod interaction;
pub mod janitor;
pub mod photo;
pub mod profile;
pub mod settings;
pub mod tag;
pub mod types;

pub use self::backup::{execute_export, execute_import, execute_passphrase};
pub use self::entity::{
    execute_add, execute_delete, execute_list, execute_merge, execute_search, execute_show,
    execute_update,
};
pub use self::group::{execute_favorite, execute_group};
pub use self::info::execute_info;
pub use self::interaction::{execute_activity, execute_history, execute_interaction, execute_log};
pub use self::janitor::execute_janitor;
pub use self::photo::execute_photo;
pub use self::profile::execute_profile;
pub use self::settings::execute_settings;
pub use self::tag::execute_tag;
pub use self::types::execute_types;

use std::fmt::Display;
use std::io::{self, Write};

use crate::config::OutputFormat;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tether_domain::{Entity, EntityId};
use tether_store::SqliteStore;

/// Load an entity or fail with a not-found error.
pub(crate) fn require_entity(store: &mut SqliteStore, id: EntityId) -> Result<Entity> {
    store
        .get_entity(id)?
        .ok_or_else(|| CliError::NotFound(format!("entity {}", id)))
}

/// Ask a yes/no question on stdin; anything but `y` declines.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

/// Print the outcome of a change: the id alone in quiet mode, else a message.
pub(crate) fn report(formatter: &Formatter, id: impl Display, message: &str) {
    match formatter.format() {
        OutputFormat::Quiet => println!("{}", id),
        _ => println!("{}", formatter.success(message)),
    }
}

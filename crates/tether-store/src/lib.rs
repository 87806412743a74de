//! Tether Storage Layer
//!
//! Implements the domain store traits on SQLite. Opening a store runs the
//! forward-only migrations, then probes the live schema so every query only
//! touches columns that exist.
//!
//! # Layout
//!
//! - `migrations` / `schema`: versioned schema steps and capability probes
//! - `entities`, `tags`, `interaction_types`, `interactions`: the core records
//! - `settings`: decay settings and store-wide score recomputation
//! - `merge`: folding duplicate entities together
//! - `backup`: snapshot export/import and the passphrase envelope
//!
//! # Examples
//!
//! ```
//! use tether_domain::{EntityType, NewEntity};
//! use tether_store::SqliteStore;
//!
//! let mut store = SqliteStore::open_in_memory().unwrap();
//! let id = store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();
//! store.record_interaction(id, "Call", None, None).unwrap();
//! ```

#![warn(missing_docs)]

mod backup;
mod entities;
mod error;
mod favorites;
mod interaction_types;
mod interactions;
mod maintenance;
mod merge;
pub mod migrations;
mod photos;
pub mod schema;
mod settings;
mod tags;

pub use backup::{
    generate_passphrase, EntityRow, EntityTagRow, Envelope, FavoriteRow, GroupMemberRow,
    ImportSummary, InteractionRow, InteractionTypeRow, InteractionTypeTagRow, PhotoRow, Snapshot,
    TagRow, ENVELOPE_ALG, SNAPSHOT_VERSION,
};
pub use error::{Result, StoreError};
pub use merge::MergeSummary;
pub use migrations::MigrationReport;
pub use schema::SchemaCapabilities;
pub use settings::DECAY_SETTINGS_KEY;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tether_domain::traits::EntityStore;
use tether_domain::{Entity, EntityId, EntityType, EntityUpdate, ListOptions, NewEntity};
use tracing::{debug, warn};

/// SQLite-backed Tether store
///
/// One handle owns one connection. Mutating operations take `&mut self`,
/// so a handle is never written from two places at once.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should open its own
/// `SqliteStore`.
pub struct SqliteStore {
    conn: Connection,
    caps: SchemaCapabilities,
    migration: MigrationReport,
    photo_dir: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and migrate it
    ///
    /// Use `:memory:` for an in-memory database.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tether_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("tether.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let in_memory = path.as_os_str() == ":memory:";
        Self::from_connection(conn, in_memory)
    }

    /// Open a fresh in-memory store
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, true)
    }

    fn from_connection(mut conn: Connection, in_memory: bool) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        if !in_memory {
            // WAL is unavailable on some filesystems; the default journal still works
            let mode = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            });
            if let Err(e) = mode {
                debug!(error = %e, "WAL journal mode not enabled");
            }
        }

        let migration = migrations::run_migrations(&mut conn)?;
        if !migration.is_clean() {
            warn!(
                failed = migration.failed.len(),
                version = migration.version,
                "Some migrations failed; affected features are disabled"
            );
        }
        let caps = SchemaCapabilities::detect(&conn)?;

        Ok(Self { conn, caps, migration, photo_dir: None })
    }

    /// Directory where imported photo content is written
    pub fn with_photo_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.photo_dir = Some(dir.into());
        self
    }

    /// Configured photo directory
    pub fn photo_dir(&self) -> Option<&Path> {
        self.photo_dir.as_deref()
    }

    /// Optional schema parts detected when the store was opened
    pub fn capabilities(&self) -> SchemaCapabilities {
        self.caps
    }

    /// Outcome of the migration run performed on open
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<u32> {
        Ok(migrations::current_version(&self.conn)?)
    }
}

impl EntityStore for SqliteStore {
    type Error = StoreError;

    fn create_entity(&mut self, entity: NewEntity) -> Result<EntityId> {
        SqliteStore::create_entity(self, entity)
    }

    fn get_entity(&mut self, id: EntityId) -> Result<Option<Entity>> {
        SqliteStore::get_entity(self, id)
    }

    fn list_entities(&mut self, options: &ListOptions) -> Result<Vec<Entity>> {
        SqliteStore::list_entities(self, options)
    }

    fn search_entities(&mut self, term: &str, entity_type: Option<EntityType>) -> Result<Vec<Entity>> {
        SqliteStore::search_entities(self, term, entity_type)
    }

    fn update_entity(&mut self, id: EntityId, update: EntityUpdate) -> Result<()> {
        SqliteStore::update_entity(self, id, update)
    }

    fn delete_entity(&mut self, id: EntityId) -> Result<()> {
        SqliteStore::delete_entity(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_in_memory_is_fully_migrated() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.capabilities().is_complete());
        assert!(store.migration_report().is_clean());
        assert_eq!(store.schema_version().unwrap(), migrations::latest_version());
    }

    #[test]
    fn test_reopen_file_store_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tether.db");

        let id = {
            let mut store = SqliteStore::new(&path).unwrap();
            store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap()
        };

        let mut store = SqliteStore::new(&path).unwrap();
        assert!(store.migration_report().applied.is_empty());
        let alice = store.get_entity(id).unwrap().unwrap();
        assert_eq!(alice.name, "Alice");
    }

    #[test]
    fn test_entity_store_trait_dispatch() {
        fn count_people<S: EntityStore>(store: &mut S) -> usize {
            let options = ListOptions { entity_type: Some(EntityType::Person), ..Default::default() };
            store.list_entities(&options).map(|v| v.len()).unwrap_or(0)
        }

        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_entity(NewEntity::new("Alice", EntityType::Person)).unwrap();
        store.create_entity(NewEntity::new("Climbers", EntityType::Group)).unwrap();
        assert_eq!(count_people(&mut store), 1);
    }
}

//! Versioned schema migrations
//!
//! The schema version lives in `PRAGMA user_version`. Each step is a
//! descriptor with an `is_applied` probe and an `apply` body; one driver
//! walks the list in order. A step runs in its own transaction together
//! with the version bump, so a crash never records a version whose changes
//! are missing. The version only advances through the unbroken prefix of
//! successful steps: once a step fails, later steps may still run, but the
//! version stays put and the failed step is retried on the next open.

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::schema::{add_column_if_missing, has_column, has_index, has_table};

/// A single schema migration step
pub struct Migration {
    /// Version reached once this step is applied
    pub version: u32,

    /// Short description for logs
    pub name: &'static str,

    /// Whether the step's changes are already present
    pub is_applied: fn(&Connection) -> rusqlite::Result<bool>,

    /// Apply the step's changes
    pub apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// Outcome of a migration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version read before running
    pub starting_version: u32,

    /// Steps whose bodies ran
    pub applied: Vec<u32>,

    /// Steps that failed, with the error text
    pub failed: Vec<(u32, String)>,

    /// Persisted version after running
    pub version: u32,
}

impl MigrationReport {
    /// Whether every pending step succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// All migration steps in order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base tables",
        is_applied: base_tables_present,
        apply: create_base_tables,
    },
    Migration {
        version: 2,
        name: "interaction type name",
        is_applied: interaction_type_name_present,
        apply: add_interaction_type_name,
    },
    Migration {
        version: 3,
        name: "tags and interaction types",
        is_applied: tag_tables_present,
        apply: create_tag_tables,
    },
    Migration {
        version: 4,
        name: "interaction type tag links and restrictions",
        is_applied: type_links_present,
        apply: create_type_links,
    },
    Migration {
        version: 5,
        name: "favorites",
        is_applied: favorites_present,
        apply: create_favorites,
    },
    Migration {
        version: 6,
        name: "interaction type weights",
        is_applied: type_weights_present,
        apply: add_type_weights,
    },
    Migration {
        version: 7,
        name: "interaction type ids and notes",
        is_applied: interaction_refs_present,
        apply: add_interaction_refs,
    },
    Migration {
        version: 8,
        name: "interaction type colors",
        is_applied: type_colors_present,
        apply: add_type_colors,
    },
    Migration {
        version: 9,
        name: "lookup indexes",
        is_applied: indexes_present,
        apply: create_indexes,
    },
];

/// Latest schema version
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Read the persisted schema version
pub fn current_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Bring the schema up to date
///
/// Individual step failures are logged and reported, not returned as
/// errors; only failures reading the version abort the run.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<MigrationReport> {
    run_steps(conn, MIGRATIONS)
}

pub(crate) fn run_steps(
    conn: &mut Connection,
    steps: &[Migration],
) -> rusqlite::Result<MigrationReport> {
    let starting_version = current_version(conn)?;
    let mut report = MigrationReport {
        starting_version,
        version: starting_version,
        ..Default::default()
    };
    let mut unbroken = true;

    for step in steps.iter().filter(|s| s.version > starting_version) {
        match apply_step(conn, step, unbroken) {
            Ok(ran) => {
                if ran {
                    report.applied.push(step.version);
                }
                if unbroken {
                    report.version = step.version;
                }
            }
            Err(e) => {
                warn!(
                    version = step.version,
                    step = step.name,
                    error = %e,
                    "Migration step failed; it will be retried on next open"
                );
                report.failed.push((step.version, e.to_string()));
                unbroken = false;
            }
        }
    }

    if report.version != starting_version {
        info!(
            from = starting_version,
            to = report.version,
            applied = report.applied.len(),
            "Schema migrated"
        );
    }

    Ok(report)
}

fn apply_step(conn: &mut Connection, step: &Migration, bump_version: bool) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;

    let already = (step.is_applied)(&tx)?;
    if already {
        debug!(version = step.version, step = step.name, "Migration step already present");
    } else {
        (step.apply)(&tx)?;
        debug!(version = step.version, step = step.name, "Migration step applied");
    }

    if bump_version {
        tx.pragma_update(None, "user_version", step.version)?;
    }
    tx.commit()?;
    Ok(!already)
}

fn base_tables_present(conn: &Connection) -> rusqlite::Result<bool> {
    for table in ["entities", "interactions", "photos", "group_members", "settings"] {
        if !has_table(conn, table)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn create_base_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('person', 'group', 'topic')),
            details TEXT,
            image TEXT,
            interaction_score REAL NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            encrypted_data TEXT
        );

        CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            uri TEXT NOT NULL,
            caption TEXT,
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            member_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (group_id, member_id)
        );

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
}

fn interaction_type_name_present(conn: &Connection) -> rusqlite::Result<bool> {
    has_column(conn, "interactions", "type")
}

fn add_interaction_type_name(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "interactions", "type", "TEXT NOT NULL DEFAULT 'General'")?;
    Ok(())
}

fn tag_tables_present(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(has_table(conn, "tags")?
        && has_table(conn, "entity_tags")?
        && has_table(conn, "interaction_types")?)
}

/// Generic interaction types every fresh store starts with
const DEFAULT_TYPES: &[(&str, &str)] = &[
    ("Message", "chatbubble"),
    ("Call", "call"),
    ("Meeting", "people"),
    ("Email", "mail"),
    ("Coffee", "cafe"),
    ("Social Media", "share-social"),
];

fn create_tag_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS entity_tags (
            entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (entity_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS interaction_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            icon TEXT NOT NULL DEFAULT '',
            tag_id INTEGER REFERENCES tags(id) ON DELETE SET NULL
        );",
    )?;

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM interaction_types", [], |row| row.get(0))?;
    if existing == 0 {
        let mut stmt = conn.prepare("INSERT INTO interaction_types (name, icon) VALUES (?1, ?2)")?;
        for (name, icon) in DEFAULT_TYPES {
            stmt.execute(params![name, icon])?;
        }
    }
    Ok(())
}

fn type_links_present(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(has_table(conn, "interaction_type_tags")?
        && has_column(conn, "interaction_types", "entity_type")?)
}

fn create_type_links(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS interaction_type_tags (
            interaction_type_id INTEGER NOT NULL REFERENCES interaction_types(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (interaction_type_id, tag_id)
        );",
    )?;
    add_column_if_missing(conn, "interaction_types", "entity_type", "TEXT")?;

    // Fold the single-tag column into the join table
    let copied = conn.execute(
        "INSERT OR IGNORE INTO interaction_type_tags (interaction_type_id, tag_id)
         SELECT it.id, it.tag_id FROM interaction_types it
         WHERE it.tag_id IS NOT NULL AND EXISTS (SELECT 1 FROM tags t WHERE t.id = it.tag_id)",
        [],
    )?;
    if copied > 0 {
        info!(links = copied, "Copied legacy interaction type tags into join table");
    }
    Ok(())
}

fn favorites_present(conn: &Connection) -> rusqlite::Result<bool> {
    has_table(conn, "favorites")
}

fn create_favorites(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS favorites (
            entity_id INTEGER PRIMARY KEY REFERENCES entities(id) ON DELETE CASCADE,
            added_at INTEGER NOT NULL
        );",
    )
}

/// Weights of the default types that count for more than one
const DEFAULT_WEIGHTS: &[(&str, u32)] = &[("Call", 2), ("Meeting", 3), ("Coffee", 3)];

fn type_weights_present(conn: &Connection) -> rusqlite::Result<bool> {
    has_column(conn, "interaction_types", "score")
}

fn add_type_weights(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "interaction_types", "score", "INTEGER NOT NULL DEFAULT 1")?;
    for (name, weight) in DEFAULT_WEIGHTS {
        conn.execute(
            "UPDATE interaction_types SET score = ?1 WHERE name = ?2 AND score = 1",
            params![weight, name],
        )?;
    }
    Ok(())
}

fn interaction_refs_present(conn: &Connection) -> rusqlite::Result<bool> {
    Ok(has_column(conn, "interactions", "type_id")? && has_column(conn, "interactions", "notes")?)
}

fn add_interaction_refs(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(
        conn,
        "interactions",
        "type_id",
        "INTEGER REFERENCES interaction_types(id) ON DELETE SET NULL",
    )?;
    add_column_if_missing(conn, "interactions", "notes", "TEXT")?;

    let backfilled = conn.execute(
        "UPDATE interactions SET type_id = (
            SELECT it.id FROM interaction_types it
            WHERE it.name = interactions.type COLLATE NOCASE
            ORDER BY it.id LIMIT 1
         )
         WHERE type_id IS NULL",
        [],
    )?;
    debug!(rows = backfilled, "Backfilled interaction type ids");
    Ok(())
}

/// Colors of the default types
const DEFAULT_COLORS: &[(&str, &str)] = &[
    ("Message", "#2196F3"),
    ("Call", "#4CAF50"),
    ("Meeting", "#FF9800"),
    ("Email", "#9C27B0"),
    ("Coffee", "#795548"),
    ("Social Media", "#E91E63"),
];

fn type_colors_present(conn: &Connection) -> rusqlite::Result<bool> {
    has_column(conn, "interaction_types", "color")
}

fn add_type_colors(conn: &Connection) -> rusqlite::Result<()> {
    add_column_if_missing(conn, "interaction_types", "color", "TEXT NOT NULL DEFAULT '#9E9E9E'")?;
    for (name, color) in DEFAULT_COLORS {
        conn.execute(
            "UPDATE interaction_types SET color = ?1 WHERE name = ?2 AND color = '#9E9E9E'",
            params![color, name],
        )?;
    }
    Ok(())
}

fn indexes_present(conn: &Connection) -> rusqlite::Result<bool> {
    has_index(conn, "idx_interactions_entity_time")
}

fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_interactions_entity_time ON interactions(entity_id, timestamp);
         CREATE INDEX IF NOT EXISTS idx_photos_entity ON photos(entity_id);
         CREATE INDEX IF NOT EXISTS idx_entity_tags_tag ON entity_tags(tag_id);
         CREATE INDEX IF NOT EXISTS idx_group_members_member ON group_members(member_id);
         CREATE INDEX IF NOT EXISTS idx_entities_type_name ON entities(type, name);",
    )
}

//! Schema introspection
//!
//! Migrations can fail part-way and be retried on a later open, so the
//! query builders never assume every column exists. The schema is probed
//! once after migration and the result is consulted from then on.

use rusqlite::{params, Connection};

/// Whether a table exists
pub fn has_table(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Whether a table has a column
pub fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|n| n.eq_ignore_ascii_case(column)))
}

/// Whether an index exists
pub fn has_index(conn: &Connection, index: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
        params![index],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Add a column unless it is already there
///
/// Returns whether the column was added.
pub fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> rusqlite::Result<bool> {
    if has_column(conn, table, column)? {
        return Ok(false);
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, column, definition
    ))?;
    Ok(true)
}

/// Optional parts of the schema that query builders depend on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaCapabilities {
    /// `interactions.type`
    pub interaction_type_name: bool,

    /// `tags`, `entity_tags` and `interaction_types` tables
    pub tags: bool,

    /// `interaction_type_tags` join table
    pub type_tag_join: bool,

    /// Legacy `interaction_types.tag_id` column
    pub legacy_type_tag: bool,

    /// `interaction_types.entity_type`
    pub type_restriction: bool,

    /// `interaction_types.score`
    pub type_weights: bool,

    /// `interaction_types.color`
    pub type_colors: bool,

    /// `interactions.type_id`
    pub interaction_type_ids: bool,

    /// `interactions.notes`
    pub interaction_notes: bool,

    /// `favorites` table
    pub favorites: bool,
}

impl SchemaCapabilities {
    /// Probe the live schema
    pub fn detect(conn: &Connection) -> rusqlite::Result<Self> {
        let tags = has_table(conn, "tags")?
            && has_table(conn, "entity_tags")?
            && has_table(conn, "interaction_types")?;

        Ok(Self {
            interaction_type_name: has_column(conn, "interactions", "type")?,
            tags,
            type_tag_join: tags && has_table(conn, "interaction_type_tags")?,
            legacy_type_tag: tags && has_column(conn, "interaction_types", "tag_id")?,
            type_restriction: tags && has_column(conn, "interaction_types", "entity_type")?,
            type_weights: tags && has_column(conn, "interaction_types", "score")?,
            type_colors: tags && has_column(conn, "interaction_types", "color")?,
            interaction_type_ids: has_column(conn, "interactions", "type_id")?,
            interaction_notes: has_column(conn, "interactions", "notes")?,
            favorites: has_table(conn, "favorites")?,
        })
    }

    /// Whether every optional part is present
    pub fn is_complete(&self) -> bool {
        self.interaction_type_name
            && self.tags
            && self.type_tag_join
            && self.legacy_type_tag
            && self.type_restriction
            && self.type_weights
            && self.type_colors
            && self.interaction_type_ids
            && self.interaction_notes
            && self.favorites
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_column_and_add_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE things (id INTEGER PRIMARY KEY)").unwrap();

        assert!(has_table(&conn, "things").unwrap());
        assert!(!has_table(&conn, "other").unwrap());
        assert!(!has_column(&conn, "things", "label").unwrap());

        assert!(add_column_if_missing(&conn, "things", "label", "TEXT").unwrap());
        assert!(!add_column_if_missing(&conn, "things", "label", "TEXT").unwrap());
        assert!(has_column(&conn, "things", "LABEL").unwrap());
    }

    #[test]
    fn test_empty_database_has_no_capabilities() {
        let conn = Connection::open_in_memory().unwrap();
        let caps = SchemaCapabilities::detect(&conn).unwrap();
        assert_eq!(caps, SchemaCapabilities::default());
        assert!(!caps.is_complete());
    }
}

//! Tags and the entity-tag join
//!
//! `tags.count` mirrors the number of `entity_tags` rows for the tag. Every
//! path that adds or removes a join row adjusts the count in the same
//! transaction, and a tag is deleted as soon as its count reaches zero.

use rusqlite::{params, Connection, OptionalExtension};
use tether_domain::tag::{normalize_tag_name, starter_interaction_types};
use tether_domain::{EntityId, EntityType, Tag, TagId};
use tracing::{debug, info};

use crate::entities::require_entity;
use crate::error::{Result, StoreError};
use crate::interaction_types::{insert_interaction_type, link_tag};
use crate::schema::SchemaCapabilities;
use crate::SqliteStore;

fn tag_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: TagId::from_value(row.get(0)?),
        name: row.get(1)?,
        count: row.get::<_, i64>(2)?.max(0) as u32,
    })
}

pub(crate) fn find_tag(conn: &Connection, name: &str) -> Result<Option<Tag>> {
    Ok(conn
        .query_row(
            "SELECT id, name, count FROM tags WHERE name = ?1 COLLATE NOCASE",
            params![name],
            tag_from_row,
        )
        .optional()?)
}

/// Find a tag by name or create it along with its starter interaction types
fn find_or_create_tag(conn: &Connection, caps: SchemaCapabilities, name: &str) -> Result<TagId> {
    if let Some(tag) = find_tag(conn, name)? {
        return Ok(tag.id);
    }

    conn.execute("INSERT INTO tags (name, count) VALUES (?1, 0)", params![name])?;
    let tag_id = TagId::from_value(conn.last_insert_rowid());

    let starters = starter_interaction_types(name);
    for template in &starters {
        let type_id = insert_interaction_type(conn, caps, template)?;
        link_tag(conn, caps, type_id, tag_id)?;
    }
    info!(tag = %name, starters = starters.len(), "Tag created");
    Ok(tag_id)
}

/// Decrement a tag's count, deleting it when nothing uses it any more
pub(crate) fn release_tag(conn: &Connection, tag_id: TagId) -> Result<()> {
    conn.execute(
        "UPDATE tags SET count = count - 1 WHERE id = ?1",
        params![tag_id.value()],
    )?;
    let removed = conn.execute(
        "DELETE FROM tags WHERE id = ?1 AND count <= 0",
        params![tag_id.value()],
    )?;
    if removed > 0 {
        debug!(tag_id = %tag_id, "Unused tag deleted");
    }
    Ok(())
}

/// Tag ids applied directly to an entity
pub(crate) fn direct_tag_ids(conn: &Connection, entity_id: EntityId) -> Result<Vec<TagId>> {
    let mut stmt = conn.prepare("SELECT tag_id FROM entity_tags WHERE entity_id = ?1 ORDER BY tag_id")?;
    let ids = stmt
        .query_map(params![entity_id.value()], |row| row.get::<_, i64>(0))?
        .map(|r| r.map(TagId::from_value))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Tag ids an entity inherits through group membership
///
/// A group inherits its members' tags; a person inherits the tags of the
/// groups it belongs to. Topics inherit nothing.
pub(crate) fn inherited_tag_ids(
    conn: &Connection,
    entity_id: EntityId,
    entity_type: EntityType,
) -> Result<Vec<TagId>> {
    let sql = match entity_type {
        EntityType::Group => {
            "SELECT DISTINCT et.tag_id FROM group_members gm
             JOIN entity_tags et ON et.entity_id = gm.member_id
             WHERE gm.group_id = ?1 ORDER BY et.tag_id"
        }
        EntityType::Person => {
            "SELECT DISTINCT et.tag_id FROM group_members gm
             JOIN entity_tags et ON et.entity_id = gm.group_id
             WHERE gm.member_id = ?1 ORDER BY et.tag_id"
        }
        EntityType::Topic => return Ok(Vec::new()),
    };

    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params![entity_id.value()], |row| row.get::<_, i64>(0))?
        .map(|r| r.map(TagId::from_value))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Remove every tag from an entity, releasing each
pub(crate) fn detach_all(conn: &Connection, entity_id: EntityId) -> Result<()> {
    let tag_ids = direct_tag_ids(conn, entity_id)?;
    conn.execute(
        "DELETE FROM entity_tags WHERE entity_id = ?1",
        params![entity_id.value()],
    )?;
    for tag_id in tag_ids {
        release_tag(conn, tag_id)?;
    }
    Ok(())
}

/// Move an entity's tags onto another entity
///
/// Tags the target already carries are released instead of duplicated.
pub(crate) fn transfer_tags(conn: &Connection, from: EntityId, to: EntityId) -> Result<usize> {
    let target_tags = direct_tag_ids(conn, to)?;
    let mut moved = 0;
    for tag_id in direct_tag_ids(conn, from)? {
        if target_tags.contains(&tag_id) {
            conn.execute(
                "DELETE FROM entity_tags WHERE entity_id = ?1 AND tag_id = ?2",
                params![from.value(), tag_id.value()],
            )?;
            release_tag(conn, tag_id)?;
        } else {
            conn.execute(
                "UPDATE entity_tags SET entity_id = ?1 WHERE entity_id = ?2 AND tag_id = ?3",
                params![to.value(), from.value(), tag_id.value()],
            )?;
            moved += 1;
        }
    }
    Ok(moved)
}

impl SqliteStore {
    /// Apply a tag to an entity, creating the tag if needed
    ///
    /// A brand-new tag also gets a starter set of interaction types themed
    /// to its name. Applying a tag the entity already has changes nothing.
    pub fn add_tag_to_entity(&mut self, entity_id: EntityId, name: &str) -> Result<TagId> {
        let name = normalize_tag_name(name)
            .ok_or_else(|| StoreError::InvalidData("tag name cannot be empty".to_string()))?;
        let caps = self.caps;

        let tx = self.conn.transaction()?;
        require_entity(&tx, entity_id)?;
        let tag_id = find_or_create_tag(&tx, caps, &name)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO entity_tags (entity_id, tag_id) VALUES (?1, ?2)",
            params![entity_id.value(), tag_id.value()],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE tags SET count = count + 1 WHERE id = ?1",
                params![tag_id.value()],
            )?;
        }
        tx.commit()?;

        debug!(entity_id = %entity_id, tag = %name, "Tag applied");
        Ok(tag_id)
    }

    /// Remove a tag from an entity
    ///
    /// Returns false if the entity did not carry the tag.
    pub fn remove_tag_from_entity(&mut self, entity_id: EntityId, name: &str) -> Result<bool> {
        let Some(name) = normalize_tag_name(name) else {
            return Ok(false);
        };

        let tx = self.conn.transaction()?;
        require_entity(&tx, entity_id)?;
        let Some(tag) = find_tag(&tx, &name)? else {
            return Ok(false);
        };
        let removed = tx.execute(
            "DELETE FROM entity_tags WHERE entity_id = ?1 AND tag_id = ?2",
            params![entity_id.value(), tag.id.value()],
        )?;
        if removed > 0 {
            release_tag(&tx, tag.id)?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Find a tag by name (case-insensitive)
    pub fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match normalize_tag_name(name) {
            Some(name) => find_tag(&self.conn, &name),
            None => Ok(None),
        }
    }

    /// Tags applied to an entity, by name
    pub fn entity_tags(&self, entity_id: EntityId) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.count FROM tags t
             JOIN entity_tags et ON et.tag_id = t.id
             WHERE et.entity_id = ?1 ORDER BY t.name COLLATE NOCASE",
        )?;
        let tags = stmt
            .query_map(params![entity_id.value()], tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// All tags, by name
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, count FROM tags ORDER BY name COLLATE NOCASE")?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }
}

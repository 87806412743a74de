//! Entity CRUD, duplicate detection, search and group membership

use std::collections::{BTreeSet, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tether_domain::dedup::{contact_fragments, fragments_overlap};
use tether_domain::score::now_millis;
use tether_domain::{
    ContactData, Entity, EntityId, EntitySort, EntityType, EntityUpdate, ListOptions, NewEntity,
};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::{tags, SqliteStore};

/// Columns selected for every entity read, in [`entity_from_row`] order
pub(crate) const ENTITY_COLUMNS: &str =
    "e.id, e.name, e.type, e.details, e.image, e.interaction_score, e.created_at, e.updated_at, e.encrypted_data";

pub(crate) fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let type_str: String = row.get(2)?;
    let entity_type = EntityType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(StoreError::InvalidData(format!("Unknown entity type: {}", type_str))),
        )
    })?;

    Ok(Entity {
        id: EntityId::from_value(row.get(0)?),
        name: row.get(1)?,
        entity_type,
        details: row.get(3)?,
        image: row.get(4)?,
        interaction_score: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        contact_blob: row.get(8)?,
    })
}

pub(crate) fn load_entity(conn: &Connection, id: EntityId) -> Result<Option<Entity>> {
    let sql = format!("SELECT {} FROM entities e WHERE e.id = ?1", ENTITY_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id.value()], entity_from_row)
        .optional()?)
}

pub(crate) fn require_entity(conn: &Connection, id: EntityId) -> Result<Entity> {
    load_entity(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("entity {}", id)))
}

pub(crate) fn query_entities(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(sql)?;
    let entities = stmt
        .query_map(params, entity_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entities)
}

/// Parse an entity's contact data, repairing the stored blob if it is corrupt
///
/// Returns the parsed (or replacement) data.
pub(crate) fn read_contact(conn: &Connection, entity: &mut Entity) -> Result<ContactData> {
    let Some(blob) = entity.contact_blob.as_deref() else {
        return Ok(ContactData::default());
    };

    match ContactData::parse(blob) {
        Ok(data) => Ok(data),
        Err(outcome) => {
            let replacement = outcome.replacement.to_blob();
            conn.execute(
                "UPDATE entities SET encrypted_data = ?1 WHERE id = ?2",
                params![replacement, entity.id.value()],
            )?;
            warn!(
                entity_id = %entity.id,
                reason = %outcome.reason,
                "Repaired corrupt contact data"
            );
            entity.contact_blob = Some(replacement);
            Ok(outcome.replacement)
        }
    }
}

pub(crate) fn repair_all(conn: &Connection, entities: &mut [Entity]) -> Result<()> {
    for entity in entities.iter_mut() {
        read_contact(conn, entity)?;
    }
    Ok(())
}

/// Fragments used to recognize the same person across records
fn entity_fragments(details: Option<&str>, contact: Option<&ContactData>) -> BTreeSet<String> {
    let mut fragments = details.map(contact_fragments).unwrap_or_default();
    if let Some(contact) = contact {
        fragments.extend(contact.fragments());
    }
    fragments
}

pub(crate) fn find_duplicate(
    conn: &Connection,
    entity_type: EntityType,
    name: &str,
    details: Option<&str>,
    contact: Option<&ContactData>,
) -> Result<Option<EntityId>> {
    let wanted = entity_fragments(details, contact);
    if wanted.is_empty() {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT id, details, encrypted_data FROM entities WHERE type = ?1 AND name = ?2 ORDER BY id",
    )?;
    let candidates = stmt
        .query_map(params![entity_type.as_str(), name.trim()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for (id, existing_details, blob) in candidates {
        // A corrupt blob contributes nothing; the next read repairs it
        let existing_contact = blob.as_deref().and_then(|b| ContactData::parse(b).ok());
        let existing = entity_fragments(existing_details.as_deref(), existing_contact.as_ref());
        if fragments_overlap(&wanted, &existing) {
            return Ok(Some(EntityId::from_value(id)));
        }
    }
    Ok(None)
}

pub(crate) fn member_ids(conn: &Connection, group_id: EntityId) -> Result<Vec<EntityId>> {
    let mut stmt =
        conn.prepare("SELECT member_id FROM group_members WHERE group_id = ?1 ORDER BY added_at, member_id")?;
    let ids = stmt
        .query_map(params![group_id.value()], |row| row.get::<_, i64>(0))?
        .map(|r| r.map(EntityId::from_value))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl SqliteStore {
    /// Create an entity
    ///
    /// If an entity with the same type and exact name already shares a
    /// phone number or email with the input, its id is returned and nothing
    /// is inserted. When only contact data is given, the details text is the
    /// contact data's searchable summary.
    ///
    /// # Examples
    ///
    /// ```
    /// use tether_domain::{EntityType, NewEntity};
    /// use tether_store::SqliteStore;
    ///
    /// let mut store = SqliteStore::open_in_memory().unwrap();
    /// let first = store
    ///     .create_entity(NewEntity::new("Alice", EntityType::Person).with_details("555-123-4567"))
    ///     .unwrap();
    /// let again = store
    ///     .create_entity(NewEntity::new("Alice", EntityType::Person).with_details("call 5551234567"))
    ///     .unwrap();
    /// assert_eq!(first, again);
    /// ```
    pub fn create_entity(&mut self, input: NewEntity) -> Result<EntityId> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::InvalidData("entity name cannot be empty".to_string()));
        }
        let details = input.effective_details();

        let tx = self.conn.transaction()?;
        if let Some(existing) = find_duplicate(
            &tx,
            input.entity_type,
            &name,
            details.as_deref(),
            input.contact.as_ref(),
        )? {
            info!(entity_id = %existing, name = %name, "Duplicate entity detected, reusing existing");
            return Ok(existing);
        }

        let now = now_millis();
        let blob = input.contact.as_ref().map(ContactData::to_blob);
        tx.execute(
            "INSERT INTO entities (name, type, details, image, interaction_score, created_at, updated_at, encrypted_data)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5, ?6)",
            params![name, input.entity_type.as_str(), details, input.image, now, blob],
        )?;
        let id = EntityId::from_value(tx.last_insert_rowid());
        tx.commit()?;
        debug!(entity_id = %id, entity_type = %input.entity_type, "Entity created");
        Ok(id)
    }

    /// Find an existing entity that duplicates the given input
    pub fn find_duplicates(
        &self,
        entity_type: EntityType,
        name: &str,
        details: Option<&str>,
        contact: Option<&ContactData>,
    ) -> Result<Option<EntityId>> {
        find_duplicate(&self.conn, entity_type, name, details, contact)
    }

    /// Get an entity by ID
    pub fn get_entity(&mut self, id: EntityId) -> Result<Option<Entity>> {
        let mut entity = load_entity(&self.conn, id)?;
        if let Some(entity) = entity.as_mut() {
            read_contact(&self.conn, entity)?;
        }
        Ok(entity)
    }

    /// Get an entity's parsed contact data
    pub fn contact_data(&mut self, id: EntityId) -> Result<ContactData> {
        let mut entity = require_entity(&self.conn, id)?;
        read_contact(&self.conn, &mut entity)
    }

    /// Get a person's birthday as recorded in their contact data
    pub fn birthday(&mut self, id: EntityId) -> Result<Option<String>> {
        Ok(self.contact_data(id)?.birthday)
    }

    /// List entities
    pub fn list_entities(&mut self, options: &ListOptions) -> Result<Vec<Entity>> {
        let favorites_join = options.favorites_first && self.caps.favorites;
        let mut sql = format!(
            "SELECT {}, (SELECT MAX(i.timestamp) FROM interactions i WHERE i.entity_id = e.id) AS last_at
             FROM entities e",
            ENTITY_COLUMNS
        );
        if favorites_join {
            sql.push_str(" LEFT JOIN favorites f ON f.entity_id = e.id");
        }

        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(entity_type) = options.entity_type {
            sql.push_str(" WHERE e.type = ?");
            params.push(Box::new(entity_type.as_str()));
        }

        let mut order = Vec::new();
        if favorites_join {
            order.push("f.entity_id IS NULL");
        }
        match options.sort {
            EntitySort::Name => order.push("e.name COLLATE NOCASE, e.id"),
            EntitySort::RecentInteraction => {
                order.push("last_at IS NULL, last_at DESC, e.name COLLATE NOCASE")
            }
            EntitySort::Updated => order.push("e.updated_at DESC, e.id DESC"),
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        if let Some(limit) = options.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut entities = query_entities(&self.conn, &sql, &param_refs)?;
        repair_all(&self.conn, &mut entities)?;
        Ok(entities)
    }

    /// Search entities
    ///
    /// Matches names, details and tag names case-insensitively, and for
    /// persons the phone numbers, emails and addresses in their contact
    /// data. Each entity appears once, ordered by name.
    pub fn search_entities(
        &mut self,
        term: &str,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<Entity>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(term));
        let mut sql = format!("SELECT DISTINCT {} FROM entities e", ENTITY_COLUMNS);
        if self.caps.tags {
            sql.push_str(
                " LEFT JOIN entity_tags et ON et.entity_id = e.id
                  LEFT JOIN tags t ON t.id = et.tag_id
                  WHERE (e.name LIKE ?1 ESCAPE '\\' OR e.details LIKE ?1 ESCAPE '\\' OR t.name LIKE ?1 ESCAPE '\\')",
            );
        } else {
            sql.push_str(" WHERE (e.name LIKE ?1 ESCAPE '\\' OR e.details LIKE ?1 ESCAPE '\\')");
        }
        let type_str = entity_type.map(|t| t.as_str());
        if type_str.is_some() {
            sql.push_str(" AND e.type = ?2");
        }

        let mut found = match type_str {
            Some(t) => query_entities(&self.conn, &sql, &[&pattern, &t])?,
            None => query_entities(&self.conn, &sql, &[&pattern])?,
        };
        let mut seen: HashSet<EntityId> = found.iter().map(|e| e.id).collect();

        if matches!(entity_type, None | Some(EntityType::Person)) {
            let sql = format!(
                "SELECT {} FROM entities e WHERE e.type = 'person' AND e.encrypted_data IS NOT NULL",
                ENTITY_COLUMNS
            );
            for mut person in query_entities(&self.conn, &sql, &[])? {
                if seen.contains(&person.id) {
                    continue;
                }
                let contact = read_contact(&self.conn, &mut person)?;
                if contact.matches(term) {
                    seen.insert(person.id);
                    found.push(person);
                }
            }
        }

        repair_all(&self.conn, &mut found)?;
        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(found)
    }

    /// Apply a partial update
    pub fn update_entity(&mut self, id: EntityId, update: EntityUpdate) -> Result<()> {
        require_entity(&self.conn, id)?;
        if update.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(StoreError::InvalidData("entity name cannot be empty".to_string()));
            }
            sets.push("name = ?");
            params.push(Box::new(name));
        }
        if let Some(details) = update.details {
            sets.push("details = ?");
            params.push(Box::new(details));
        }
        if let Some(image) = update.image {
            sets.push("image = ?");
            params.push(Box::new(image));
        }
        if let Some(contact) = update.contact {
            sets.push("encrypted_data = ?");
            params.push(Box::new(contact.as_ref().map(ContactData::to_blob)));
        }

        sets.push("updated_at = ?");
        params.push(Box::new(now_millis()));
        params.push(Box::new(id.value()));

        let sql = format!("UPDATE entities SET {} WHERE id = ?", sets.join(", "));
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.conn.execute(&sql, param_refs.as_slice())?;
        debug!(entity_id = %id, "Entity updated");
        Ok(())
    }

    /// Delete an entity
    ///
    /// Interactions, photos, memberships and favorites go with it; its tags
    /// are released and tags left unused are deleted.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<()> {
        let caps = self.caps;
        let tx = self.conn.transaction()?;
        require_entity(&tx, id)?;
        if caps.tags {
            tags::detach_all(&tx, id)?;
        }
        tx.execute("DELETE FROM entities WHERE id = ?1", params![id.value()])?;
        tx.commit()?;
        info!(entity_id = %id, "Entity deleted");
        Ok(())
    }

    /// Add a member to a group
    ///
    /// Returns false if the member was already in the group.
    pub fn add_group_member(&mut self, group_id: EntityId, member_id: EntityId) -> Result<bool> {
        let group = require_entity(&self.conn, group_id)?;
        if !group.is_group() {
            return Err(StoreError::NotAGroup(group_id.value()));
        }
        require_entity(&self.conn, member_id)?;
        if group_id == member_id {
            return Err(StoreError::InvalidData("a group cannot contain itself".to_string()));
        }

        let added = self.conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, member_id, added_at) VALUES (?1, ?2, ?3)",
            params![group_id.value(), member_id.value(), now_millis()],
        )?;
        Ok(added > 0)
    }

    /// Remove a member from a group
    pub fn remove_group_member(&mut self, group_id: EntityId, member_id: EntityId) -> Result<bool> {
        let group = require_entity(&self.conn, group_id)?;
        if !group.is_group() {
            return Err(StoreError::NotAGroup(group_id.value()));
        }
        let removed = self.conn.execute(
            "DELETE FROM group_members WHERE group_id = ?1 AND member_id = ?2",
            params![group_id.value(), member_id.value()],
        )?;
        Ok(removed > 0)
    }

    /// List a group's members
    pub fn group_members(&mut self, group_id: EntityId) -> Result<Vec<Entity>> {
        let group = require_entity(&self.conn, group_id)?;
        if !group.is_group() {
            return Err(StoreError::NotAGroup(group_id.value()));
        }
        let sql = format!(
            "SELECT {} FROM entities e JOIN group_members gm ON gm.member_id = e.id
             WHERE gm.group_id = ?1 ORDER BY e.name COLLATE NOCASE",
            ENTITY_COLUMNS
        );
        let mut members = query_entities(&self.conn, &sql, &[&group_id.value()])?;
        repair_all(&self.conn, &mut members)?;
        Ok(members)
    }

    /// List the groups an entity belongs to
    pub fn groups_of(&mut self, member_id: EntityId) -> Result<Vec<Entity>> {
        require_entity(&self.conn, member_id)?;
        let sql = format!(
            "SELECT {} FROM entities e JOIN group_members gm ON gm.group_id = e.id
             WHERE gm.member_id = ?1 ORDER BY e.name COLLATE NOCASE",
            ENTITY_COLUMNS
        );
        let mut groups = query_entities(&self.conn, &sql, &[&member_id.value()])?;
        repair_all(&self.conn, &mut groups)?;
        Ok(groups)
    }
}

//! Interaction type storage and per-entity resolution

use std::collections::HashMap;

use rusqlite::{params, Connection, ToSql};
use tether_domain::entity_type::{format_restriction, parse_restriction};
use tether_domain::{
    resolve_interaction_types, Entity, EntityId, InteractionType, InteractionTypeId,
    InteractionTypeTemplate, ResolutionContext, TagId, DEFAULT_COLOR,
};
use tracing::debug;

use crate::entities::require_entity;
use crate::error::{Result, StoreError};
use crate::schema::SchemaCapabilities;
use crate::tags::{direct_tag_ids, inherited_tag_ids};
use crate::SqliteStore;

/// Load every interaction type with its tag links
///
/// Links come from the join table plus the legacy single-tag column where
/// either exists. Columns the schema lacks are read as defaults.
pub(crate) fn all_interaction_types(
    conn: &Connection,
    caps: SchemaCapabilities,
) -> Result<Vec<InteractionType>> {
    if !caps.tags {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, name, icon, {}, {}, {} FROM interaction_types ORDER BY name COLLATE NOCASE, id",
        if caps.type_restriction { "entity_type" } else { "NULL" },
        if caps.type_weights { "score" } else { "1" },
        if caps.type_colors { "color" } else { "NULL" },
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut types = stmt
        .query_map([], |row| {
            let restriction: Option<String> = row.get(3)?;
            let score: Option<i64> = row.get(4)?;
            Ok(InteractionType {
                id: InteractionTypeId::from_value(row.get(0)?),
                name: row.get(1)?,
                icon: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                entity_types: restriction.as_deref().map(parse_restriction).unwrap_or_default(),
                score: score.unwrap_or(0).clamp(0, u32::MAX as i64) as u32,
                color: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                tag_ids: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut links: HashMap<i64, Vec<TagId>> = HashMap::new();
    let mut link_sources = Vec::new();
    if caps.type_tag_join {
        link_sources.push("SELECT interaction_type_id, tag_id FROM interaction_type_tags");
    }
    if caps.legacy_type_tag {
        link_sources.push("SELECT id, tag_id FROM interaction_types WHERE tag_id IS NOT NULL");
    }
    for source in link_sources {
        let mut stmt = conn.prepare(source)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for (type_id, tag_id) in rows {
            let entry = links.entry(type_id).or_default();
            let tag_id = TagId::from_value(tag_id);
            if !entry.contains(&tag_id) {
                entry.push(tag_id);
            }
        }
    }

    for t in types.iter_mut() {
        if let Some(mut tag_ids) = links.remove(&t.id.value()) {
            tag_ids.sort();
            t.tag_ids = tag_ids;
        }
    }
    Ok(types)
}

/// Interaction types available to an entity
pub(crate) fn resolve_for_entity(
    conn: &Connection,
    caps: SchemaCapabilities,
    entity: &Entity,
) -> Result<Vec<InteractionType>> {
    let all = all_interaction_types(conn, caps)?;
    let (direct_tags, inherited_tags) = if caps.tags {
        (
            direct_tag_ids(conn, entity.id)?,
            inherited_tag_ids(conn, entity.id, entity.entity_type)?,
        )
    } else {
        (Vec::new(), Vec::new())
    };

    let ctx = ResolutionContext {
        entity_type: entity.entity_type,
        direct_tags,
        inherited_tags,
    };
    Ok(resolve_interaction_types(&ctx, &all))
}

/// Find the interaction type an entity means by a display name
///
/// Types available to the entity win; otherwise any type with that name.
pub(crate) fn lookup_type(
    conn: &Connection,
    caps: SchemaCapabilities,
    entity: &Entity,
    name: &str,
) -> Result<Option<InteractionType>> {
    let name = name.trim();
    let available = resolve_for_entity(conn, caps, entity)?;
    if let Some(found) = available.into_iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
        return Ok(Some(found));
    }
    Ok(all_interaction_types(conn, caps)?
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .map(InteractionType::with_defaults))
}

fn validate_template(template: &InteractionTypeTemplate) -> Result<()> {
    if template.name.trim().is_empty() {
        return Err(StoreError::InvalidData(
            "interaction type name cannot be empty".to_string(),
        ));
    }
    if template.score == 0 {
        return Err(StoreError::InvalidData(
            "interaction type weight must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Columns and values for an interaction type write, limited to what the
/// schema has
fn template_columns(
    caps: SchemaCapabilities,
    template: &InteractionTypeTemplate,
) -> (Vec<&'static str>, Vec<Box<dyn ToSql>>) {
    let mut columns = vec!["name", "icon"];
    let mut values: Vec<Box<dyn ToSql>> = vec![
        Box::new(template.name.trim().to_string()),
        Box::new(template.icon.clone()),
    ];
    if caps.type_restriction {
        columns.push("entity_type");
        values.push(Box::new(format_restriction(&template.entity_types)));
    }
    if caps.type_weights {
        columns.push("score");
        values.push(Box::new(template.score));
    }
    if caps.type_colors {
        columns.push("color");
        let color = if template.color.trim().is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            template.color.clone()
        };
        values.push(Box::new(color));
    }
    (columns, values)
}

pub(crate) fn insert_interaction_type(
    conn: &Connection,
    caps: SchemaCapabilities,
    template: &InteractionTypeTemplate,
) -> Result<InteractionTypeId> {
    validate_template(template)?;
    let (columns, values) = template_columns(caps, template);
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO interaction_types ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    );
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&sql, refs.as_slice())?;
    Ok(InteractionTypeId::from_value(conn.last_insert_rowid()))
}

/// Link an interaction type to a tag
pub(crate) fn link_tag(
    conn: &Connection,
    caps: SchemaCapabilities,
    type_id: InteractionTypeId,
    tag_id: TagId,
) -> Result<bool> {
    let changed = if caps.type_tag_join {
        conn.execute(
            "INSERT OR IGNORE INTO interaction_type_tags (interaction_type_id, tag_id) VALUES (?1, ?2)",
            params![type_id.value(), tag_id.value()],
        )?
    } else {
        conn.execute(
            "UPDATE interaction_types SET tag_id = ?1 WHERE id = ?2",
            params![tag_id.value(), type_id.value()],
        )?
    };
    Ok(changed > 0)
}

fn require_type(conn: &Connection, id: InteractionTypeId) -> Result<()> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM interaction_types WHERE id = ?1",
        params![id.value()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(StoreError::NotFound(format!("interaction type {}", id)));
    }
    Ok(())
}

impl SqliteStore {
    /// All interaction types, by name
    pub fn list_interaction_types(&self) -> Result<Vec<InteractionType>> {
        Ok(all_interaction_types(&self.conn, self.caps)?
            .into_iter()
            .map(InteractionType::with_defaults)
            .collect())
    }

    /// Get an interaction type by ID
    pub fn interaction_type(&self, id: InteractionTypeId) -> Result<Option<InteractionType>> {
        Ok(all_interaction_types(&self.conn, self.caps)?
            .into_iter()
            .find(|t| t.id == id)
            .map(InteractionType::with_defaults))
    }

    /// Interaction types offered for an entity
    ///
    /// Generic types, types restricted to the entity's type, and types
    /// linked to the entity's own or inherited tags.
    pub fn entity_interaction_types(&self, entity_id: EntityId) -> Result<Vec<InteractionType>> {
        let entity = require_entity(&self.conn, entity_id)?;
        resolve_for_entity(&self.conn, self.caps, &entity)
    }

    /// Create an interaction type linked to the given tags
    pub fn create_interaction_type(
        &mut self,
        template: &InteractionTypeTemplate,
        tag_ids: &[TagId],
    ) -> Result<InteractionTypeId> {
        let caps = self.caps;
        let tx = self.conn.transaction()?;
        let id = insert_interaction_type(&tx, caps, template)?;
        for tag_id in tag_ids {
            link_tag(&tx, caps, id, *tag_id)?;
        }
        tx.commit()?;
        debug!(type_id = %id, name = %template.name, "Interaction type created");
        Ok(id)
    }

    /// Replace an interaction type's name, icon, restriction, weight and color
    ///
    /// Scores are not recomputed here; the next recompute picks up the new
    /// weight.
    pub fn update_interaction_type(
        &mut self,
        id: InteractionTypeId,
        template: &InteractionTypeTemplate,
    ) -> Result<()> {
        validate_template(template)?;
        require_type(&self.conn, id)?;
        let (columns, mut values) = template_columns(self.caps, template);
        let sets: Vec<String> = columns.iter().map(|c| format!("{} = ?", c)).collect();
        values.push(Box::new(id.value()));
        let sql = format!("UPDATE interaction_types SET {} WHERE id = ?", sets.join(", "));
        let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        self.conn.execute(&sql, refs.as_slice())?;
        Ok(())
    }

    /// Delete an interaction type
    ///
    /// Interactions keep their display name and lose the type reference.
    pub fn delete_interaction_type(&mut self, id: InteractionTypeId) -> Result<()> {
        require_type(&self.conn, id)?;
        self.conn.execute(
            "DELETE FROM interaction_types WHERE id = ?1",
            params![id.value()],
        )?;
        debug!(type_id = %id, "Interaction type deleted");
        Ok(())
    }

    /// Link an interaction type to a tag
    pub fn link_interaction_type_tag(
        &mut self,
        type_id: InteractionTypeId,
        tag_id: TagId,
    ) -> Result<bool> {
        require_type(&self.conn, type_id)?;
        link_tag(&self.conn, self.caps, type_id, tag_id)
    }

    /// Remove a link between an interaction type and a tag
    pub fn unlink_interaction_type_tag(
        &mut self,
        type_id: InteractionTypeId,
        tag_id: TagId,
    ) -> Result<bool> {
        let mut changed = 0;
        if self.caps.type_tag_join {
            changed += self.conn.execute(
                "DELETE FROM interaction_type_tags WHERE interaction_type_id = ?1 AND tag_id = ?2",
                params![type_id.value(), tag_id.value()],
            )?;
        }
        if self.caps.legacy_type_tag {
            changed += self.conn.execute(
                "UPDATE interaction_types SET tag_id = NULL WHERE id = ?1 AND tag_id = ?2",
                params![type_id.value(), tag_id.value()],
            )?;
        }
        Ok(changed > 0)
    }
}

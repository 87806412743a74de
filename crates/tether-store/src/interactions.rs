//! Interaction recording and scoring
//!
//! Every write that touches an interaction recomputes the owning entity's
//! score inside the same transaction. Recording against a group writes one
//! row for the group and one for each current member.

use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tether_domain::interaction::DEFAULT_INTERACTION_NAME;
use tether_domain::score::{compute_score, is_valid_timestamp, now_millis};
use tether_domain::{
    ActivityBucket, DecaySettings, Entity, EntityId, Interaction, InteractionEdit, InteractionId,
    InteractionTypeId, WeightedEvent, DEFAULT_COLOR,
};
use tracing::{debug, info};

use crate::entities::{member_ids, require_entity};
use crate::error::{Result, StoreError};
use crate::interaction_types::lookup_type;
use crate::schema::SchemaCapabilities;
use crate::settings::load_settings;
use crate::SqliteStore;

fn interaction_select(caps: SchemaCapabilities) -> String {
    format!(
        "SELECT i.id, i.entity_id, i.timestamp, {}, {}, {} FROM interactions i",
        if caps.interaction_type_name { "i.type" } else { "NULL" },
        if caps.interaction_type_ids { "i.type_id" } else { "NULL" },
        if caps.interaction_notes { "i.notes" } else { "NULL" },
    )
}

fn interaction_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Interaction> {
    Ok(Interaction {
        id: InteractionId::from_value(row.get(0)?),
        entity_id: EntityId::from_value(row.get(1)?),
        timestamp: row.get(2)?,
        type_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| DEFAULT_INTERACTION_NAME.to_string()),
        type_id: row.get::<_, Option<i64>>(4)?.map(InteractionTypeId::from_value),
        notes: row.get(5)?,
    })
}

fn load_interaction(
    conn: &Connection,
    caps: SchemaCapabilities,
    id: InteractionId,
) -> Result<Interaction> {
    let sql = format!("{} WHERE i.id = ?1", interaction_select(caps));
    conn.query_row(&sql, params![id.value()], interaction_from_row)
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("interaction {}", id)))
}

/// SQL expression for an interaction row's weight
fn weight_expr(caps: SchemaCapabilities) -> String {
    if !(caps.tags && caps.type_weights) {
        return "1".to_string();
    }
    let mut candidates = Vec::new();
    if caps.interaction_type_ids {
        candidates.push("(SELECT t.score FROM interaction_types t WHERE t.id = i.type_id)");
    }
    if caps.interaction_type_name {
        candidates.push(
            "(SELECT t.score FROM interaction_types t WHERE t.name = i.type COLLATE NOCASE ORDER BY t.id LIMIT 1)",
        );
    }
    candidates.push("1");
    format!("COALESCE({})", candidates.join(", "))
}

/// Weighted events for one entity
pub(crate) fn weighted_events(
    conn: &Connection,
    caps: SchemaCapabilities,
    entity_id: EntityId,
) -> Result<Vec<WeightedEvent>> {
    let sql = format!(
        "SELECT i.timestamp, {} FROM interactions i WHERE i.entity_id = ?1",
        weight_expr(caps)
    );
    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params![entity_id.value()], |row| {
            let weight: i64 = row.get(1)?;
            Ok(WeightedEvent {
                timestamp: row.get(0)?,
                weight: weight.clamp(1, u32::MAX as i64) as u32,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

/// Recompute and persist one entity's score
pub(crate) fn recompute_score(
    conn: &Connection,
    caps: SchemaCapabilities,
    entity_id: EntityId,
    settings: &DecaySettings,
    now: i64,
) -> Result<f64> {
    let events = weighted_events(conn, caps, entity_id)?;
    let score = compute_score(&events, now, settings);
    conn.execute(
        "UPDATE entities SET interaction_score = ?1 WHERE id = ?2",
        params![score, entity_id.value()],
    )?;
    Ok(score)
}

struct ResolvedType {
    name: String,
    id: Option<InteractionTypeId>,
}

/// Map a requested type name onto a stored type for this entity
fn resolve_type_name(
    conn: &Connection,
    caps: SchemaCapabilities,
    entity: &Entity,
    requested: &str,
) -> Result<ResolvedType> {
    let requested = requested.trim();
    if requested.is_empty() {
        return Ok(ResolvedType {
            name: DEFAULT_INTERACTION_NAME.to_string(),
            id: None,
        });
    }
    Ok(match lookup_type(conn, caps, entity, requested)? {
        Some(t) => ResolvedType {
            name: t.name,
            id: Some(t.id),
        },
        None => ResolvedType {
            name: requested.to_string(),
            id: None,
        },
    })
}

fn insert_interaction(
    conn: &Connection,
    caps: SchemaCapabilities,
    entity_id: EntityId,
    timestamp: i64,
    resolved: &ResolvedType,
    notes: Option<&str>,
) -> Result<InteractionId> {
    let entity_raw = entity_id.value();
    let type_id = resolved.id.map(|id| id.value());
    let mut columns = vec!["entity_id", "timestamp"];
    let mut values: Vec<&dyn ToSql> = vec![&entity_raw, &timestamp];

    if caps.interaction_type_name {
        columns.push("type");
        values.push(&resolved.name);
    }
    if caps.interaction_type_ids {
        columns.push("type_id");
        values.push(&type_id);
    }
    if caps.interaction_notes {
        columns.push("notes");
        values.push(&notes);
    }

    let sql = format!(
        "INSERT INTO interactions ({}) VALUES ({})",
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );
    conn.execute(&sql, values.as_slice())?;
    Ok(InteractionId::from_value(conn.last_insert_rowid()))
}

fn require_valid_timestamp(timestamp: i64) -> Result<()> {
    if is_valid_timestamp(timestamp) {
        Ok(())
    } else {
        Err(StoreError::InvalidData(format!(
            "timestamp {} is out of range",
            timestamp
        )))
    }
}

fn activity(
    conn: &Connection,
    format: &str,
    entity_id: Option<EntityId>,
) -> Result<Vec<ActivityBucket>> {
    let filter = if entity_id.is_some() { "WHERE entity_id = ?2" } else { "" };
    let sql = format!(
        "SELECT strftime(?1, timestamp / 1000, 'unixepoch') AS period, COUNT(*)
         FROM interactions {} GROUP BY period ORDER BY period",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok(ActivityBucket {
            period: row.get(0)?,
            count: row.get::<_, i64>(1)? as u32,
        })
    };
    let buckets = match entity_id {
        Some(id) => stmt
            .query_map(params![format, id.value()], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map(params![format], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(buckets)
}

impl SqliteStore {
    /// Record an interaction and update the score
    ///
    /// `type_name` is matched case-insensitively against the types offered
    /// to the entity, then against every type; unknown names are stored
    /// as given with weight 1. For a group the interaction is also recorded
    /// for every member, all in one transaction. Returns the id of the
    /// entity's own interaction row.
    pub fn record_interaction(
        &mut self,
        entity_id: EntityId,
        type_name: &str,
        timestamp: Option<i64>,
        notes: Option<&str>,
    ) -> Result<InteractionId> {
        let caps = self.caps;
        let now = now_millis();
        let timestamp = timestamp.unwrap_or(now);
        require_valid_timestamp(timestamp)?;

        let tx = self.conn.transaction()?;
        let settings = load_settings(&tx)?;
        let entity = require_entity(&tx, entity_id)?;
        let resolved = resolve_type_name(&tx, caps, &entity, type_name)?;

        let id = insert_interaction(&tx, caps, entity_id, timestamp, &resolved, notes)?;
        recompute_score(&tx, caps, entity_id, &settings, now)?;

        let mut fanned_out = 0;
        if entity.is_group() {
            for member in member_ids(&tx, entity_id)? {
                insert_interaction(&tx, caps, member, timestamp, &resolved, notes)?;
                recompute_score(&tx, caps, member, &settings, now)?;
                fanned_out += 1;
            }
        }
        tx.commit()?;

        debug!(
            entity_id = %entity_id,
            interaction = %resolved.name,
            members = fanned_out,
            "Interaction recorded"
        );
        Ok(id)
    }

    /// Change an interaction's timestamp, type or notes
    pub fn edit_interaction(&mut self, id: InteractionId, edit: InteractionEdit) -> Result<Interaction> {
        if let Some(timestamp) = edit.timestamp {
            require_valid_timestamp(timestamp)?;
        }
        let caps = self.caps;
        let tx = self.conn.transaction()?;
        let settings = load_settings(&tx)?;
        let mut interaction = load_interaction(&tx, caps, id)?;

        if let Some(timestamp) = edit.timestamp {
            interaction.timestamp = timestamp;
        }
        if let Some(type_name) = edit.type_name.as_deref() {
            let entity = require_entity(&tx, interaction.entity_id)?;
            let resolved = resolve_type_name(&tx, caps, &entity, type_name)?;
            interaction.type_name = resolved.name;
            interaction.type_id = resolved.id;
        }
        if let Some(notes) = edit.notes {
            interaction.notes = notes;
        }

        tx.execute(
            "UPDATE interactions SET timestamp = ?1 WHERE id = ?2",
            params![interaction.timestamp, id.value()],
        )?;
        if caps.interaction_type_name {
            tx.execute(
                "UPDATE interactions SET type = ?1 WHERE id = ?2",
                params![interaction.type_name, id.value()],
            )?;
        }
        if caps.interaction_type_ids {
            tx.execute(
                "UPDATE interactions SET type_id = ?1 WHERE id = ?2",
                params![interaction.type_id.map(|t| t.value()), id.value()],
            )?;
        }
        if caps.interaction_notes {
            tx.execute(
                "UPDATE interactions SET notes = ?1 WHERE id = ?2",
                params![interaction.notes, id.value()],
            )?;
        }

        recompute_score(&tx, caps, interaction.entity_id, &settings, now_millis())?;
        tx.commit()?;
        Ok(interaction)
    }

    /// Delete an interaction and update the score
    pub fn delete_interaction(&mut self, id: InteractionId) -> Result<()> {
        let caps = self.caps;
        let tx = self.conn.transaction()?;
        let settings = load_settings(&tx)?;
        let interaction = load_interaction(&tx, caps, id)?;
        tx.execute("DELETE FROM interactions WHERE id = ?1", params![id.value()])?;
        recompute_score(&tx, caps, interaction.entity_id, &settings, now_millis())?;
        tx.commit()?;
        info!(interaction_id = %id, entity_id = %interaction.entity_id, "Interaction deleted");
        Ok(())
    }

    /// Interactions with an entity, newest first
    pub fn interaction_logs(&self, entity_id: EntityId, limit: Option<usize>) -> Result<Vec<Interaction>> {
        require_entity(&self.conn, entity_id)?;
        let mut sql = format!(
            "{} WHERE i.entity_id = ?1 ORDER BY i.timestamp DESC, i.id DESC",
            interaction_select(self.caps)
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![entity_id.value()], interaction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// Interaction counts per UTC day (`YYYY-MM-DD`), oldest first
    ///
    /// Counts cover one entity, or the whole store when `entity_id` is `None`.
    pub fn interaction_counts_by_day(&self, entity_id: Option<EntityId>) -> Result<Vec<ActivityBucket>> {
        activity(&self.conn, "%Y-%m-%d", entity_id)
    }

    /// Interaction counts per UTC month (`YYYY-MM`), oldest first
    pub fn interaction_counts_by_month(&self, entity_id: Option<EntityId>) -> Result<Vec<ActivityBucket>> {
        activity(&self.conn, "%Y-%m", entity_id)
    }

    /// Compute an entity's score under the given settings without storing it
    pub fn calculate_score(&self, entity_id: EntityId, settings: &DecaySettings) -> Result<f64> {
        require_entity(&self.conn, entity_id)?;
        let events = weighted_events(&self.conn, self.caps, entity_id)?;
        Ok(compute_score(&events, now_millis(), settings))
    }

    /// Recompute and store one entity's score with the current settings
    pub fn refresh_score(&mut self, entity_id: EntityId) -> Result<f64> {
        require_entity(&self.conn, entity_id)?;
        let settings = load_settings(&self.conn)?;
        recompute_score(&self.conn, self.caps, entity_id, &settings, now_millis())
    }

    /// Display color of an interaction's type
    pub fn interaction_color(&self, interaction: &Interaction) -> Result<String> {
        let Some(type_id) = interaction.type_id else {
            return Ok(DEFAULT_COLOR.to_string());
        };
        Ok(self
            .interaction_type(type_id)?
            .map(|t| t.color)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()))
    }
}

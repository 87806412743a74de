//! Merging duplicate entities
//!
//! A merge folds a source entity into a target of the same type and
//! deletes the source. Everything happens in one transaction: either both
//! entities are left as they were or the source is gone and every reference
//! to it points at the target.

use rusqlite::{params, Connection};
use tether_domain::score::now_millis;
use tether_domain::{ContactData, Entity, EntityId};
use tracing::{info, warn};

use crate::entities::require_entity;
use crate::error::{Result, StoreError};
use crate::interactions::recompute_score;
use crate::settings::load_settings;
use crate::{tags, SqliteStore};

/// What a merge moved onto the target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Interactions retargeted
    pub interactions: usize,

    /// Photos retargeted
    pub photos: usize,

    /// Tags newly applied to the target
    pub tags: usize,

    /// Group memberships carried over
    pub memberships: usize,
}

/// Parse contact data for merging; corrupt blobs count as empty
fn contact_for_merge(entity: &Entity) -> ContactData {
    let Some(blob) = entity.contact_blob.as_deref() else {
        return ContactData::default();
    };
    ContactData::parse(blob).unwrap_or_else(|outcome| {
        warn!(entity_id = %entity.id, reason = %outcome.reason, "Ignoring corrupt contact data during merge");
        outcome.replacement
    })
}

fn merge_contact(conn: &Connection, source: &Entity, target: &Entity) -> Result<()> {
    let source_contact = contact_for_merge(source);
    let mut merged = contact_for_merge(target);
    let had_contact = !merged.is_empty() || !source_contact.is_empty();
    merged.merge_from(&source_contact);

    let details = if had_contact {
        let summary = merged.searchable_summary();
        if summary.is_empty() {
            target.details.clone()
        } else {
            Some(summary)
        }
    } else {
        target.details.clone().or_else(|| source.details.clone())
    };
    let blob = if had_contact { Some(merged.to_blob()) } else { target.contact_blob.clone() };

    conn.execute(
        "UPDATE entities SET details = ?1, encrypted_data = ?2, image = COALESCE(image, ?3), updated_at = ?4
         WHERE id = ?5",
        params![details, blob, source.image, now_millis(), target.id.value()],
    )?;
    Ok(())
}

fn move_memberships(conn: &Connection, source: EntityId, target: EntityId) -> Result<usize> {
    let as_member = conn.execute(
        "INSERT OR IGNORE INTO group_members (group_id, member_id, added_at)
         SELECT group_id, ?2, added_at FROM group_members WHERE member_id = ?1 AND group_id != ?2",
        params![source.value(), target.value()],
    )?;
    let as_group = conn.execute(
        "INSERT OR IGNORE INTO group_members (group_id, member_id, added_at)
         SELECT ?2, member_id, added_at FROM group_members WHERE group_id = ?1 AND member_id != ?2",
        params![source.value(), target.value()],
    )?;
    Ok(as_member + as_group)
}

impl SqliteStore {
    /// Fold `source_id` into `target_id` and delete the source
    ///
    /// Both entities must exist and share a type. Interactions and photos
    /// move to the target; tags, contact data, group memberships and the
    /// favorite flag are unioned; the target's score is recomputed.
    pub fn merge_entities(&mut self, source_id: EntityId, target_id: EntityId) -> Result<MergeSummary> {
        if source_id == target_id {
            return Err(StoreError::InvalidData("cannot merge an entity into itself".to_string()));
        }
        let caps = self.caps;

        let tx = self.conn.transaction()?;
        let source = require_entity(&tx, source_id)?;
        let target = require_entity(&tx, target_id)?;
        if source.entity_type != target.entity_type {
            return Err(StoreError::TypeMismatch {
                source_type: source.entity_type,
                target_type: target.entity_type,
            });
        }

        let mut summary = MergeSummary {
            interactions: tx.execute(
                "UPDATE interactions SET entity_id = ?1 WHERE entity_id = ?2",
                params![target_id.value(), source_id.value()],
            )?,
            photos: tx.execute(
                "UPDATE photos SET entity_id = ?1 WHERE entity_id = ?2",
                params![target_id.value(), source_id.value()],
            )?,
            ..Default::default()
        };
        if caps.tags {
            summary.tags = tags::transfer_tags(&tx, source_id, target_id)?;
        }
        summary.memberships = move_memberships(&tx, source_id, target_id)?;
        if caps.favorites {
            tx.execute(
                "INSERT OR IGNORE INTO favorites (entity_id, added_at)
                 SELECT ?2, added_at FROM favorites WHERE entity_id = ?1",
                params![source_id.value(), target_id.value()],
            )?;
        }
        merge_contact(&tx, &source, &target)?;

        tx.execute("DELETE FROM entities WHERE id = ?1", params![source_id.value()])?;

        let settings = load_settings(&tx)?;
        recompute_score(&tx, caps, target_id, &settings, now_millis())?;
        tx.commit()?;

        info!(
            source = %source_id,
            target = %target_id,
            interactions = summary.interactions,
            photos = summary.photos,
            tags = summary.tags,
            "Entities merged"
        );
        Ok(summary)
    }
}

//! Store-wide maintenance used by the janitor

use rusqlite::Connection;
use tether_domain::traits::{MaintenanceAudit, MaintenanceStore, TagReconciliation};
use tether_domain::ContactData;
use tracing::info;

use crate::entities::{query_entities, read_contact, ENTITY_COLUMNS};
use crate::error::{Result, StoreError};
use crate::SqliteStore;

/// Set every tag's count from the join table and delete unused tags
pub(crate) fn reconcile_tags(conn: &Connection) -> Result<TagReconciliation> {
    let removed = conn.execute(
        "DELETE FROM tags WHERE NOT EXISTS (SELECT 1 FROM entity_tags et WHERE et.tag_id = tags.id)",
        [],
    )?;
    let corrected = conn.execute(
        "UPDATE tags SET count = (SELECT COUNT(*) FROM entity_tags et WHERE et.tag_id = tags.id)
         WHERE count != (SELECT COUNT(*) FROM entity_tags et WHERE et.tag_id = tags.id)",
        [],
    )?;
    Ok(TagReconciliation { corrected, removed })
}

fn count(conn: &Connection, sql: &str) -> Result<usize> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n.max(0) as usize)
}

impl MaintenanceStore for SqliteStore {
    type Error = StoreError;

    fn audit(&mut self) -> Result<MaintenanceAudit> {
        let mut audit = MaintenanceAudit {
            entities: count(&self.conn, "SELECT COUNT(*) FROM entities")?,
            ..Default::default()
        };

        if self.caps.tags {
            audit.orphan_tags = count(
                &self.conn,
                "SELECT COUNT(*) FROM tags t
                 WHERE NOT EXISTS (SELECT 1 FROM entity_tags et WHERE et.tag_id = t.id)",
            )?;
            audit.stale_tag_counts = count(
                &self.conn,
                "SELECT COUNT(*) FROM tags t
                 WHERE EXISTS (SELECT 1 FROM entity_tags et WHERE et.tag_id = t.id)
                   AND t.count != (SELECT COUNT(*) FROM entity_tags et WHERE et.tag_id = t.id)",
            )?;
        }

        let mut stmt = self
            .conn
            .prepare("SELECT encrypted_data FROM entities WHERE encrypted_data IS NOT NULL")?;
        let blobs = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        audit.corrupt_contact_blobs = blobs
            .iter()
            .filter(|b| ContactData::parse(b).is_err())
            .count();

        Ok(audit)
    }

    fn recompute_all_scores(&mut self) -> Result<usize> {
        SqliteStore::recompute_all_scores(self)
    }

    fn reconcile_tag_counts(&mut self) -> Result<TagReconciliation> {
        if !self.caps.tags {
            return Ok(TagReconciliation::default());
        }
        let tx = self.conn.transaction()?;
        let result = reconcile_tags(&tx)?;
        tx.commit()?;
        if result.corrected > 0 || result.removed > 0 {
            info!(corrected = result.corrected, removed = result.removed, "Tag counts reconciled");
        }
        Ok(result)
    }

    fn repair_contact_blobs(&mut self) -> Result<usize> {
        let sql = format!(
            "SELECT {} FROM entities e WHERE e.encrypted_data IS NOT NULL",
            ENTITY_COLUMNS
        );
        let tx = self.conn.transaction()?;
        let mut repaired = 0;
        for mut entity in query_entities(&tx, &sql, &[])? {
            let before = entity.contact_blob.clone();
            read_contact(&tx, &mut entity)?;
            if entity.contact_blob != before {
                repaired += 1;
            }
        }
        tx.commit()?;
        Ok(repaired)
    }
}

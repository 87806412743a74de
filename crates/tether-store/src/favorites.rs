//! Favorite (pinned) entities

use rusqlite::params;
use tether_domain::score::now_millis;
use tether_domain::{Entity, EntityId};

use crate::entities::{query_entities, repair_all, require_entity, ENTITY_COLUMNS};
use crate::error::{Result, StoreError};
use crate::SqliteStore;

impl SqliteStore {
    fn require_favorites(&self) -> Result<()> {
        if self.caps.favorites {
            Ok(())
        } else {
            Err(StoreError::InvalidData(
                "favorites are unavailable until the schema migration succeeds".to_string(),
            ))
        }
    }

    /// Flip an entity's favorite flag, returning the new state
    pub fn toggle_favorite(&mut self, entity_id: EntityId) -> Result<bool> {
        self.require_favorites()?;
        require_entity(&self.conn, entity_id)?;

        let removed = self.conn.execute(
            "DELETE FROM favorites WHERE entity_id = ?1",
            params![entity_id.value()],
        )?;
        if removed > 0 {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO favorites (entity_id, added_at) VALUES (?1, ?2)",
            params![entity_id.value(), now_millis()],
        )?;
        Ok(true)
    }

    /// Whether an entity is a favorite
    pub fn is_favorite(&self, entity_id: EntityId) -> Result<bool> {
        if !self.caps.favorites {
            return Ok(false);
        }
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE entity_id = ?1",
            params![entity_id.value()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Favorite entities, most recently pinned first
    pub fn favorites(&mut self) -> Result<Vec<Entity>> {
        if !self.caps.favorites {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM entities e JOIN favorites f ON f.entity_id = e.id
             ORDER BY f.added_at DESC, e.id",
            ENTITY_COLUMNS
        );
        let mut favorites = query_entities(&self.conn, &sql, &[])?;
        repair_all(&self.conn, &mut favorites)?;
        Ok(favorites)
    }
}

//! Photos attached to entities

use rusqlite::params;
use tether_domain::score::now_millis;
use tether_domain::{EntityId, Photo, PhotoId};

use crate::entities::require_entity;
use crate::error::{Result, StoreError};
use crate::SqliteStore;

pub(crate) fn photo_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: PhotoId::from_value(row.get(0)?),
        entity_id: EntityId::from_value(row.get(1)?),
        uri: row.get(2)?,
        caption: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

impl SqliteStore {
    /// Attach a photo to an entity
    pub fn add_photo(
        &mut self,
        entity_id: EntityId,
        uri: &str,
        caption: Option<&str>,
        timestamp: Option<i64>,
    ) -> Result<PhotoId> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(StoreError::InvalidData("photo uri cannot be empty".to_string()));
        }
        require_entity(&self.conn, entity_id)?;
        self.conn.execute(
            "INSERT INTO photos (entity_id, uri, caption, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![entity_id.value(), uri, caption, timestamp.unwrap_or_else(now_millis)],
        )?;
        Ok(PhotoId::from_value(self.conn.last_insert_rowid()))
    }

    /// Photos of an entity, newest first
    pub fn photos(&self, entity_id: EntityId) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entity_id, uri, caption, timestamp FROM photos
             WHERE entity_id = ?1 ORDER BY timestamp DESC, id DESC",
        )?;
        let photos = stmt
            .query_map(params![entity_id.value()], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    /// Remove a photo record (the image itself is left alone)
    pub fn delete_photo(&mut self, id: PhotoId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM photos WHERE id = ?1", params![id.value()])?;
        Ok(removed > 0)
    }
}

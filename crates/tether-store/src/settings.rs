//! Decay settings record and store-wide score recomputation

use rusqlite::{params, Connection, OptionalExtension};
use tether_domain::score::now_millis;
use tether_domain::{DecaySettings, EntityId};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::interactions::recompute_score;
use crate::schema::SchemaCapabilities;
use crate::SqliteStore;

/// Key of the decay settings row in the `settings` table
pub const DECAY_SETTINGS_KEY: &str = "decay_settings";

/// Read the decay settings, falling back to defaults for missing or bad rows
pub(crate) fn load_settings(conn: &Connection) -> Result<DecaySettings> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![DECAY_SETTINGS_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let Some(raw) = raw else {
        return Ok(DecaySettings::default());
    };

    match serde_json::from_str::<DecaySettings>(&raw) {
        Ok(settings) if settings.validate().is_ok() => Ok(settings),
        Ok(settings) => {
            warn!(factor = settings.decay_factor, "Stored decay factor is invalid, using defaults");
            Ok(DecaySettings::default())
        }
        Err(e) => {
            warn!(error = %e, "Stored decay settings are unreadable, using defaults");
            Ok(DecaySettings::default())
        }
    }
}

pub(crate) fn save_settings(conn: &Connection, settings: &DecaySettings) -> Result<()> {
    let value = serde_json::to_string(settings)?;
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![DECAY_SETTINGS_KEY, value],
    )?;
    Ok(())
}

/// Recompute every entity's score
pub(crate) fn recompute_all(
    conn: &Connection,
    caps: SchemaCapabilities,
    settings: &DecaySettings,
) -> Result<usize> {
    let now = now_millis();
    let mut stmt = conn.prepare("SELECT id FROM entities ORDER BY id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for id in &ids {
        recompute_score(conn, caps, EntityId::from_value(*id), settings, now)?;
    }
    Ok(ids.len())
}

impl SqliteStore {
    /// Current decay settings
    pub fn settings(&self) -> Result<DecaySettings> {
        load_settings(&self.conn)
    }

    /// Replace the decay settings and recompute every score
    ///
    /// Returns the number of entities recomputed.
    pub fn update_settings(&mut self, settings: DecaySettings) -> Result<usize> {
        settings.validate().map_err(StoreError::InvalidData)?;
        let caps = self.caps;

        let tx = self.conn.transaction()?;
        save_settings(&tx, &settings)?;
        let count = recompute_all(&tx, caps, &settings)?;
        tx.commit()?;

        info!(
            factor = settings.decay_factor,
            decay = %settings.decay_type,
            entities = count,
            "Decay settings updated"
        );
        Ok(count)
    }

    /// Recompute every entity's score with the current settings
    ///
    /// Scores depend on wall-clock time, so they drift between interactions
    /// whenever decay is enabled.
    pub fn recompute_all_scores(&mut self) -> Result<usize> {
        let caps = self.caps;
        let tx = self.conn.transaction()?;
        let settings = load_settings(&tx)?;
        let count = recompute_all(&tx, caps, &settings)?;
        tx.commit()?;
        Ok(count)
    }
}

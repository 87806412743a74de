//! Backup export and import
//!
//! A snapshot is one JSON document holding every row of every table plus the
//! decay settings. It is optionally wrapped in a passphrase [`Envelope`].
//! Import replaces the whole store inside one transaction, so a backup that
//! fails to decrypt, parse or insert leaves the store untouched.

mod envelope;
mod passphrase;

pub use envelope::{Envelope, ENVELOPE_ALG};
pub use passphrase::generate_passphrase;

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tether_domain::interaction::DEFAULT_INTERACTION_NAME;
use tether_domain::passphrase::validate_passphrase;
use tether_domain::score::now_millis;
use tether_domain::{DecaySettings, EntityType, DEFAULT_COLOR};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::maintenance::reconcile_tags;
use crate::settings::{load_settings, save_settings};
use crate::SqliteStore;

/// Snapshot format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// Entity row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    /// Row id
    pub id: i64,
    /// Display name
    pub name: String,
    /// `person`, `group` or `topic`
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Free-text details
    #[serde(default)]
    pub details: Option<String>,
    /// Avatar uri
    #[serde(default)]
    pub image: Option<String>,
    /// Cached score
    #[serde(default)]
    pub interaction_score: f64,
    /// Creation time (ms)
    pub created_at: i64,
    /// Last update time (ms)
    pub updated_at: i64,
    /// Serialized contact data
    #[serde(default)]
    pub encrypted_data: Option<String>,
}

fn default_type_name() -> String {
    DEFAULT_INTERACTION_NAME.to_string()
}

/// Interaction row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRow {
    /// Row id
    pub id: i64,
    /// Entity the interaction was logged against
    pub entity_id: i64,
    /// When it happened (ms)
    pub timestamp: i64,
    /// Type name at the time of logging
    #[serde(rename = "type", default = "default_type_name")]
    pub type_name: String,
    /// Referenced interaction type
    #[serde(default)]
    pub type_id: Option<i64>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// Photo row with optional embedded content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRow {
    /// Row id
    pub id: i64,
    /// Owning entity
    pub entity_id: i64,
    /// Where the image lived when exported
    pub uri: String,
    /// Caption
    #[serde(default)]
    pub caption: Option<String>,
    /// When the photo was added (ms)
    pub timestamp: i64,
    /// Base64 image content, present when the uri was a readable local file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Tag row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    /// Row id
    pub id: i64,
    /// Tag name
    pub name: String,
    /// Number of entities carrying the tag
    #[serde(default)]
    pub count: i64,
}

/// Entity to tag link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTagRow {
    /// Tagged entity
    pub entity_id: i64,
    /// Applied tag
    pub tag_id: i64,
}

fn default_weight() -> i64 {
    1
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// Interaction type row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionTypeRow {
    /// Row id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Icon name
    #[serde(default)]
    pub icon: String,
    /// Comma-separated entity type restriction
    #[serde(default)]
    pub entity_type: Option<String>,
    /// Weight
    #[serde(default = "default_weight")]
    pub score: i64,
    /// Display color
    #[serde(default = "default_color")]
    pub color: String,
    /// Single linked tag from older exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<i64>,
}

/// Interaction type to tag link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionTypeTagRow {
    /// Linked type
    pub interaction_type_id: i64,
    /// Linked tag
    pub tag_id: i64,
}

/// Group membership row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberRow {
    /// Group entity
    pub group_id: i64,
    /// Member entity
    pub member_id: i64,
    /// When the member joined (ms)
    #[serde(default)]
    pub added_at: i64,
}

/// Favorite row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRow {
    /// Favorited entity
    pub entity_id: i64,
    /// When it was favorited (ms)
    #[serde(default)]
    pub added_at: i64,
}

/// Full store contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version
    pub version: u32,
    /// Export time (ms)
    pub timestamp: i64,
    /// Entities
    pub entities: Vec<EntityRow>,
    /// Interactions
    #[serde(default)]
    pub interactions: Vec<InteractionRow>,
    /// Photos
    #[serde(default)]
    pub photos: Vec<PhotoRow>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<TagRow>,
    /// Entity to tag links
    #[serde(default)]
    pub entity_tags: Vec<EntityTagRow>,
    /// Interaction types
    #[serde(default)]
    pub interaction_types: Vec<InteractionTypeRow>,
    /// Interaction type to tag links
    #[serde(default)]
    pub interaction_type_tags: Vec<InteractionTypeTagRow>,
    /// Group memberships
    #[serde(default)]
    pub group_members: Vec<GroupMemberRow>,
    /// Favorites
    #[serde(default)]
    pub favorites: Vec<FavoriteRow>,
    /// Decay settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<DecaySettings>,
}

/// Row counts restored by an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entities restored
    pub entities: usize,
    /// Interactions restored
    pub interactions: usize,
    /// Photos restored
    pub photos: usize,
    /// Photo files written to the photo directory
    pub photo_files: usize,
    /// Tags restored (after dropping unused ones)
    pub tags: usize,
    /// Interaction types restored
    pub interaction_types: usize,
    /// Group memberships restored
    pub group_members: usize,
    /// Favorites restored
    pub favorites: usize,
}

fn collect<T, F>(conn: &Connection, sql: &str, f: F) -> Result<Vec<T>>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], f)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Path of a photo uri on the local filesystem, if it names one
fn local_path(uri: &str) -> Option<PathBuf> {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    if path.is_empty() || path.contains("://") {
        return None;
    }
    Some(PathBuf::from(path))
}

fn embed_photo(uri: &str) -> Option<String> {
    let path = local_path(uri)?;
    match fs::read(&path) {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Photo not embedded");
            None
        }
    }
}

/// Photo files written during an import
///
/// Content is written under a staging directory inside the photo directory
/// and only moved to its final name once the import has committed. A failed
/// import discards the staging directory, leaving the photo directory as it
/// was.
struct PhotoStaging {
    target: PathBuf,
    staging: PathBuf,
    files: Vec<String>,
}

impl PhotoStaging {
    fn new(target: &Path) -> Self {
        let staging = target.join(format!(".import-{}-{}", std::process::id(), now_millis()));
        Self {
            target: target.to_path_buf(),
            staging,
            files: Vec::new(),
        }
    }

    /// Stage embedded content and return the uri it will have once published
    fn stage(&mut self, photo: &PhotoRow, data: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| StoreError::InvalidData(format!("photo {} content: {}", photo.id, e)))?;
        let file_name = local_path(&photo.uri)
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "photo".to_string());
        let name = format!("{}-{}", photo.id, file_name);

        fs::create_dir_all(&self.staging)?;
        fs::write(self.staging.join(&name), bytes)?;
        let uri = self.target.join(&name).to_string_lossy().into_owned();
        self.files.push(name);
        Ok(uri)
    }

    /// Move staged files to their final names
    fn publish(self) {
        for name in &self.files {
            let from = self.staging.join(name);
            let to = self.target.join(name);
            if let Err(e) = fs::rename(&from, &to) {
                warn!(path = %to.display(), error = %e, "Failed to move restored photo into place");
            }
        }
        self.discard();
    }

    /// Remove the staging directory and anything still in it
    fn discard(self) {
        if self.staging.exists() {
            if let Err(e) = fs::remove_dir_all(&self.staging) {
                warn!(path = %self.staging.display(), error = %e, "Failed to remove photo staging directory");
            }
        }
    }
}

fn read_snapshot(conn: &Connection) -> Result<Snapshot> {
    let entities = collect(
        conn,
        "SELECT id, name, type, details, image, interaction_score, created_at, updated_at, encrypted_data
         FROM entities ORDER BY id",
        |row| {
            Ok(EntityRow {
                id: row.get(0)?,
                name: row.get(1)?,
                entity_type: row.get(2)?,
                details: row.get(3)?,
                image: row.get(4)?,
                interaction_score: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
                encrypted_data: row.get(8)?,
            })
        },
    )?;

    let interactions = collect(
        conn,
        "SELECT id, entity_id, timestamp, type, type_id, notes FROM interactions ORDER BY id",
        |row| {
            Ok(InteractionRow {
                id: row.get(0)?,
                entity_id: row.get(1)?,
                timestamp: row.get(2)?,
                type_name: row.get(3)?,
                type_id: row.get(4)?,
                notes: row.get(5)?,
            })
        },
    )?;

    let mut photos = collect(
        conn,
        "SELECT id, entity_id, uri, caption, timestamp FROM photos ORDER BY id",
        |row| {
            Ok(PhotoRow {
                id: row.get(0)?,
                entity_id: row.get(1)?,
                uri: row.get(2)?,
                caption: row.get(3)?,
                timestamp: row.get(4)?,
                data: None,
            })
        },
    )?;
    for photo in &mut photos {
        photo.data = embed_photo(&photo.uri);
    }

    let tags = collect(conn, "SELECT id, name, count FROM tags ORDER BY id", |row| {
        Ok(TagRow { id: row.get(0)?, name: row.get(1)?, count: row.get(2)? })
    })?;

    let entity_tags = collect(
        conn,
        "SELECT entity_id, tag_id FROM entity_tags ORDER BY entity_id, tag_id",
        |row| Ok(EntityTagRow { entity_id: row.get(0)?, tag_id: row.get(1)? }),
    )?;

    let interaction_types = collect(
        conn,
        "SELECT id, name, icon, entity_type, score, color FROM interaction_types ORDER BY id",
        |row| {
            Ok(InteractionTypeRow {
                id: row.get(0)?,
                name: row.get(1)?,
                icon: row.get(2)?,
                entity_type: row.get(3)?,
                score: row.get(4)?,
                color: row.get(5)?,
                tag_id: None,
            })
        },
    )?;

    // Links still held only in the legacy column are exported through the join
    let interaction_type_tags = collect(
        conn,
        "SELECT interaction_type_id, tag_id FROM interaction_type_tags
         UNION
         SELECT id, tag_id FROM interaction_types WHERE tag_id IS NOT NULL
         ORDER BY 1, 2",
        |row| {
            Ok(InteractionTypeTagRow { interaction_type_id: row.get(0)?, tag_id: row.get(1)? })
        },
    )?;

    let group_members = collect(
        conn,
        "SELECT group_id, member_id, added_at FROM group_members ORDER BY group_id, member_id",
        |row| {
            Ok(GroupMemberRow { group_id: row.get(0)?, member_id: row.get(1)?, added_at: row.get(2)? })
        },
    )?;

    let favorites = collect(
        conn,
        "SELECT entity_id, added_at FROM favorites ORDER BY entity_id",
        |row| Ok(FavoriteRow { entity_id: row.get(0)?, added_at: row.get(1)? }),
    )?;

    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        timestamp: now_millis(),
        entities,
        interactions,
        photos,
        tags,
        entity_tags,
        interaction_types,
        interaction_type_tags,
        group_members,
        favorites,
        settings: Some(load_settings(conn)?),
    })
}

fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM favorites;
         DELETE FROM group_members;
         DELETE FROM photos;
         DELETE FROM interactions;
         DELETE FROM interaction_type_tags;
         DELETE FROM entity_tags;
         DELETE FROM interaction_types;
         DELETE FROM tags;
         DELETE FROM entities;",
    )?;
    Ok(())
}

fn write_snapshot(
    conn: &Connection,
    snapshot: &Snapshot,
    mut photos: Option<&mut PhotoStaging>,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    {
        let mut stmt = conn.prepare(
            "INSERT INTO entities (id, name, type, details, image, interaction_score, created_at, updated_at, encrypted_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for e in &snapshot.entities {
            if EntityType::parse(&e.entity_type).is_none() {
                return Err(StoreError::InvalidData(format!(
                    "entity {} has unknown type {:?}",
                    e.id, e.entity_type
                )));
            }
            stmt.execute(params![
                e.id,
                e.name,
                e.entity_type,
                e.details,
                e.image,
                e.interaction_score,
                e.created_at,
                e.updated_at,
                e.encrypted_data
            ])?;
        }
        summary.entities = snapshot.entities.len();
    }

    {
        let mut stmt = conn.prepare("INSERT INTO tags (id, name, count) VALUES (?1, ?2, ?3)")?;
        for t in &snapshot.tags {
            stmt.execute(params![t.id, t.name, t.count])?;
        }
    }

    {
        let mut stmt =
            conn.prepare("INSERT OR IGNORE INTO entity_tags (entity_id, tag_id) VALUES (?1, ?2)")?;
        for link in &snapshot.entity_tags {
            stmt.execute(params![link.entity_id, link.tag_id])?;
        }
    }

    {
        let mut stmt = conn.prepare(
            "INSERT INTO interaction_types (id, name, icon, entity_type, score, color)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for t in &snapshot.interaction_types {
            let color = if t.color.trim().is_empty() { DEFAULT_COLOR } else { t.color.as_str() };
            stmt.execute(params![t.id, t.name, t.icon, t.entity_type, t.score.max(1), color])?;
        }
        summary.interaction_types = snapshot.interaction_types.len();
    }

    {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO interaction_type_tags (interaction_type_id, tag_id)
             SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM tags WHERE id = ?2)",
        )?;
        let legacy = snapshot
            .interaction_types
            .iter()
            .filter_map(|t| t.tag_id.map(|tag| (t.id, tag)));
        let links = snapshot
            .interaction_type_tags
            .iter()
            .map(|l| (l.interaction_type_id, l.tag_id))
            .chain(legacy);
        for (type_id, tag_id) in links {
            stmt.execute(params![type_id, tag_id])?;
        }
    }

    {
        let mut stmt = conn.prepare(
            "INSERT INTO interactions (id, entity_id, timestamp, type, type_id, notes)
             VALUES (?1, ?2, ?3, ?4,
                     (SELECT id FROM interaction_types WHERE id = ?5), ?6)",
        )?;
        for i in &snapshot.interactions {
            stmt.execute(params![i.id, i.entity_id, i.timestamp, i.type_name, i.type_id, i.notes])?;
        }
        summary.interactions = snapshot.interactions.len();
    }

    {
        let mut stmt = conn.prepare(
            "INSERT INTO photos (id, entity_id, uri, caption, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for p in &snapshot.photos {
            let uri = match (p.data.as_deref(), photos.as_deref_mut()) {
                (Some(data), Some(staging)) => {
                    summary.photo_files += 1;
                    staging.stage(p, data)?
                }
                (Some(_), None) => {
                    warn!(photo_id = p.id, "No photo directory configured, keeping original uri");
                    p.uri.clone()
                }
                (None, _) => p.uri.clone(),
            };
            stmt.execute(params![p.id, p.entity_id, uri, p.caption, p.timestamp])?;
        }
        summary.photos = snapshot.photos.len();
    }

    {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO group_members (group_id, member_id, added_at) VALUES (?1, ?2, ?3)",
        )?;
        for m in &snapshot.group_members {
            stmt.execute(params![m.group_id, m.member_id, m.added_at])?;
        }
        summary.group_members = snapshot.group_members.len();
    }

    {
        let mut stmt =
            conn.prepare("INSERT OR IGNORE INTO favorites (entity_id, added_at) VALUES (?1, ?2)")?;
        for f in &snapshot.favorites {
            stmt.execute(params![f.entity_id, f.added_at])?;
        }
        summary.favorites = snapshot.favorites.len();
    }

    let reconciled = reconcile_tags(conn)?;
    if reconciled.corrected > 0 || reconciled.removed > 0 {
        debug!(
            corrected = reconciled.corrected,
            removed = reconciled.removed,
            "Imported tag counts reconciled"
        );
    }
    summary.tags = snapshot.tags.len().saturating_sub(reconciled.removed);

    if let Some(settings) = &snapshot.settings {
        settings.validate().map_err(StoreError::InvalidData)?;
        save_settings(conn, settings)?;
    }

    Ok(summary)
}

/// Parse a backup document, decrypting it when it is an envelope
fn decode_backup(input: &str, passphrase: Option<&str>) -> Result<Snapshot> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    let snapshot: Snapshot = if Envelope::is_envelope(&value) {
        let passphrase = passphrase.ok_or_else(|| {
            StoreError::InvalidPassphrase("backup is encrypted; a passphrase is required".to_string())
        })?;
        let envelope: Envelope = serde_json::from_value(value)?;
        let plaintext = envelope.open(passphrase)?;
        serde_json::from_slice(&plaintext)?
    } else {
        serde_json::from_value(value)?
    };

    if snapshot.version > SNAPSHOT_VERSION {
        return Err(StoreError::InvalidData(format!(
            "backup version {} is newer than supported version {}",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot)
}

impl SqliteStore {
    fn require_complete_schema(&self) -> Result<()> {
        if self.caps.is_complete() {
            Ok(())
        } else {
            Err(StoreError::InvalidData(
                "schema is not fully migrated; backups are unavailable".to_string(),
            ))
        }
    }

    /// Capture the whole store as a snapshot
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        self.require_complete_schema()?;
        read_snapshot(&self.conn)
    }

    /// Serialize the store, encrypted when a passphrase is given
    ///
    /// The passphrase must be six lowercase words (see
    /// [`generate_passphrase`]).
    pub fn export_backup(&self, passphrase: Option<&str>) -> Result<String> {
        let snapshot = self.export_snapshot()?;
        let output = match passphrase {
            Some(passphrase) => {
                if !validate_passphrase(passphrase) {
                    return Err(StoreError::InvalidPassphrase(
                        "expected six lowercase words".to_string(),
                    ));
                }
                let plaintext = serde_json::to_vec(&snapshot)?;
                serde_json::to_string_pretty(&Envelope::seal(&plaintext, passphrase)?)?
            }
            None => serde_json::to_string_pretty(&snapshot)?,
        };

        info!(
            entities = snapshot.entities.len(),
            interactions = snapshot.interactions.len(),
            encrypted = passphrase.is_some(),
            "Backup exported"
        );
        Ok(output)
    }

    /// Replace the entire store with the contents of a backup
    ///
    /// Encrypted backups need the passphrase they were exported with. On
    /// any failure the store is left exactly as it was.
    pub fn import_backup(&mut self, input: &str, passphrase: Option<&str>) -> Result<ImportSummary> {
        self.require_complete_schema()?;
        let snapshot = decode_backup(input, passphrase)?;

        let mut staging = self.photo_dir.as_deref().map(PhotoStaging::new);
        let tx = self.conn.transaction()?;
        let written = match clear_all(&tx)
            .and_then(|()| write_snapshot(&tx, &snapshot, staging.as_mut()))
        {
            Ok(summary) => tx.commit().map(|()| summary).map_err(StoreError::from),
            Err(e) => Err(e),
        };
        let summary = match written {
            Ok(summary) => {
                if let Some(staging) = staging {
                    staging.publish();
                }
                summary
            }
            Err(e) => {
                if let Some(staging) = staging {
                    staging.discard();
                }
                return Err(e);
            }
        };

        info!(
            entities = summary.entities,
            interactions = summary.interactions,
            photos = summary.photos,
            tags = summary.tags,
            "Backup imported"
        );
        Ok(summary)
    }
}

//! Store error type

use tether_domain::EntityType;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Snapshot or settings (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backup integrity tag did not match
    #[error("Backup integrity check failed: wrong passphrase or corrupted file")]
    Integrity,

    /// Backup envelope is malformed
    #[error("Invalid backup envelope: {0}")]
    InvalidEnvelope(String),

    /// Merge attempted across entity types
    #[error("Cannot merge a {source_type} into a {target_type}")]
    TypeMismatch {
        /// Type of the entity being absorbed
        source_type: EntityType,
        /// Type of the surviving entity
        target_type: EntityType,
    },

    /// Group operation on a non-group entity
    #[error("Entity {0} is not a group")]
    NotAGroup(i64),

    /// Passphrase missing or not six lowercase words
    #[error("Invalid passphrase: {0}")]
    InvalidPassphrase(String),

    /// Key derivation or cipher setup failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Filesystem error (photo content)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

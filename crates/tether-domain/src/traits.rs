//! Trait definitions for storage backends
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. The SQLite implementation lives in `tether-store`.

use crate::{Entity, EntityId, EntityType, EntityUpdate, ListOptions, NewEntity};

/// Trait for storing and retrieving entities
pub trait EntityStore {
    /// Error type for store operations
    type Error;

    /// Create an entity, or return the id of an existing duplicate
    fn create_entity(&mut self, entity: NewEntity) -> Result<EntityId, Self::Error>;

    /// Get an entity by ID
    fn get_entity(&mut self, id: EntityId) -> Result<Option<Entity>, Self::Error>;

    /// List entities
    fn list_entities(&mut self, options: &ListOptions) -> Result<Vec<Entity>, Self::Error>;

    /// Search entities by name, details, tags and contact data
    fn search_entities(
        &mut self,
        term: &str,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<Entity>, Self::Error>;

    /// Apply a partial update
    fn update_entity(&mut self, id: EntityId, update: EntityUpdate) -> Result<(), Self::Error>;

    /// Delete an entity and everything it owns
    fn delete_entity(&mut self, id: EntityId) -> Result<(), Self::Error>;
}

/// Read-only summary of maintenance work waiting to be done
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceAudit {
    /// Entities whose score would be recomputed
    pub entities: usize,

    /// Tags whose stored count disagrees with their usage
    pub stale_tag_counts: usize,

    /// Tags no entity uses any more
    pub orphan_tags: usize,

    /// Contact blobs that fail to parse
    pub corrupt_contact_blobs: usize,
}

impl MaintenanceAudit {
    /// Whether there is nothing to fix (score refresh aside)
    pub fn is_clean(&self) -> bool {
        self.stale_tag_counts == 0 && self.orphan_tags == 0 && self.corrupt_contact_blobs == 0
    }
}

/// Result of reconciling tag counts with the entity-tag join
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagReconciliation {
    /// Tags whose count was corrected
    pub corrected: usize,

    /// Zero-count tags deleted
    pub removed: usize,
}

/// Trait for the periodic maintenance a store supports
///
/// Used by `tether-janitor`.
pub trait MaintenanceStore {
    /// Error type for maintenance operations
    type Error;

    /// Inspect the store without changing it
    fn audit(&mut self) -> Result<MaintenanceAudit, Self::Error>;

    /// Recompute every entity's score with the current settings
    fn recompute_all_scores(&mut self) -> Result<usize, Self::Error>;

    /// Fix tag counts and drop tags nobody uses
    fn reconcile_tag_counts(&mut self) -> Result<TagReconciliation, Self::Error>;

    /// Replace unparsable contact blobs with empty ones
    fn repair_contact_blobs(&mut self) -> Result<usize, Self::Error>;
}

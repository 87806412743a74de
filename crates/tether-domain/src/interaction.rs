//! Interaction module - timestamped events and their categories

use crate::score::DEFAULT_WEIGHT;
use crate::{EntityId, EntityType, InteractionId, InteractionTypeId, TagId};

/// Color used when an interaction type has none recorded
pub const DEFAULT_COLOR: &str = "#9E9E9E";

/// Display name used for interactions recorded before types existed
pub const DEFAULT_INTERACTION_NAME: &str = "General";

/// A recorded interaction with an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Unique identifier
    pub id: InteractionId,

    /// Owning entity
    pub entity_id: EntityId,

    /// When it happened (ms since epoch)
    pub timestamp: i64,

    /// Display name of the interaction type
    pub type_name: String,

    /// Resolved interaction type (absent on legacy rows)
    pub type_id: Option<InteractionTypeId>,

    /// Free-text notes
    pub notes: Option<String>,
}

/// Edit of an existing interaction; every change triggers a score recompute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionEdit {
    /// New timestamp
    pub timestamp: Option<i64>,

    /// New type, by display name
    pub type_name: Option<String>,

    /// New notes (`Some(None)` clears them)
    pub notes: Option<Option<String>>,
}

/// A named, weighted, colored interaction category
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionType {
    /// Unique identifier
    pub id: InteractionTypeId,

    /// Display name
    pub name: String,

    /// Icon name
    pub icon: String,

    /// Entity types this category is restricted to (empty = any)
    pub entity_types: Vec<EntityType>,

    /// Weight contributed to the score by each interaction
    pub score: u32,

    /// Display color (`#RRGGBB`)
    pub color: String,

    /// Tags this category is linked to
    pub tag_ids: Vec<TagId>,
}

impl InteractionType {
    /// Whether the category has neither tag links nor a type restriction
    pub fn is_generic(&self) -> bool {
        self.tag_ids.is_empty() && self.entity_types.is_empty()
    }

    /// Whether the category is explicitly restricted to this entity type
    pub fn restricted_to(&self, entity_type: EntityType) -> bool {
        self.entity_types.contains(&entity_type)
    }

    /// Whether the category is linked to any of the given tags
    pub fn linked_to_any(&self, tags: &[TagId]) -> bool {
        self.tag_ids.iter().any(|t| tags.contains(t))
    }

    /// Replace missing cached metadata with defaults
    pub fn with_defaults(mut self) -> Self {
        if self.color.trim().is_empty() {
            self.color = DEFAULT_COLOR.to_string();
        }
        if self.score == 0 {
            self.score = DEFAULT_WEIGHT;
        }
        self
    }
}

/// Input for creating an interaction type
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionTypeTemplate {
    /// Display name
    pub name: String,

    /// Icon name
    pub icon: String,

    /// Entity type restriction (empty = any)
    pub entity_types: Vec<EntityType>,

    /// Weight
    pub score: u32,

    /// Display color
    pub color: String,
}

impl InteractionTypeTemplate {
    /// Create an unrestricted template with default weight and color
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            entity_types: Vec::new(),
            score: DEFAULT_WEIGHT,
            color: DEFAULT_COLOR.to_string(),
        }
    }

    /// Set the weight
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score.max(1);
        self
    }

    /// Set the color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Restrict to entity types
    pub fn restricted_to(mut self, types: &[EntityType]) -> Self {
        self.entity_types = types.to_vec();
        self
    }
}

/// Interaction count for one day (`YYYY-MM-DD`) or month (`YYYY-MM`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityBucket {
    /// Period label
    pub period: String,

    /// Number of interactions recorded in the period
    pub count: u32,
}

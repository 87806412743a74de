//! Entity module - the people, groups and topics being tracked

use crate::contact::ContactData;
use crate::{EntityId, EntityType, PhotoId};

/// A tracked person, group or topic
///
/// Timestamps are milliseconds since the Unix epoch. `contact_blob` is the
/// serialized [`ContactData`] exactly as stored; use
/// [`ContactData::parse`](crate::contact::ContactData::parse) to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,

    /// Display name
    pub name: String,

    /// Person, group or topic
    pub entity_type: EntityType,

    /// Free-text details (also holds the searchable contact summary)
    pub details: Option<String>,

    /// Image reference (uri or path)
    pub image: Option<String>,

    /// Current decayed closeness score (always >= 0)
    pub interaction_score: f64,

    /// Creation time
    pub created_at: i64,

    /// Last modification time
    pub updated_at: i64,

    /// Serialized contact data
    pub contact_blob: Option<String>,
}

impl Entity {
    /// Whether this entity can have members
    pub fn is_group(&self) -> bool {
        self.entity_type == EntityType::Group
    }
}

/// Input for creating an entity
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    /// Display name
    pub name: String,

    /// Entity type
    pub entity_type: EntityType,

    /// Free-text details
    pub details: Option<String>,

    /// Image reference
    pub image: Option<String>,

    /// Structured contact data
    pub contact: Option<ContactData>,
}

impl NewEntity {
    /// Create input with just a name and type
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            details: None,
            image: None,
            contact: None,
        }
    }

    /// Attach free-text details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach an image reference
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Attach structured contact data
    pub fn with_contact(mut self, contact: ContactData) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Details to persist: explicit details win, otherwise the contact summary
    pub fn effective_details(&self) -> Option<String> {
        if let Some(details) = &self.details {
            return Some(details.clone());
        }
        self.contact
            .as_ref()
            .map(|c| c.searchable_summary())
            .filter(|s| !s.is_empty())
    }
}

/// Partial update of an entity
///
/// `None` leaves a field untouched; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityUpdate {
    /// New name
    pub name: Option<String>,

    /// New details
    pub details: Option<Option<String>>,

    /// New image reference
    pub image: Option<Option<String>>,

    /// New contact data
    pub contact: Option<Option<ContactData>>,
}

impl EntityUpdate {
    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.details.is_none() && self.image.is_none() && self.contact.is_none()
    }
}

/// Sort order for entity listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntitySort {
    /// Alphabetical by name
    #[default]
    Name,

    /// Most recent interaction first (entities without interactions last)
    RecentInteraction,

    /// Most recently updated first
    Updated,
}

impl EntitySort {
    /// Parse a sort key
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "name" => Some(EntitySort::Name),
            "recent_interaction" | "recent" => Some(EntitySort::RecentInteraction),
            "updated" => Some(EntitySort::Updated),
            _ => None,
        }
    }
}

/// Criteria for listing entities
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only entities of this type
    pub entity_type: Option<EntityType>,

    /// Sort order
    pub sort: EntitySort,

    /// Put favorites before everything else
    pub favorites_first: bool,

    /// Maximum results to return
    pub limit: Option<usize>,
}

/// A photo attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    /// Unique identifier
    pub id: PhotoId,

    /// Owning entity
    pub entity_id: EntityId,

    /// Where the image lives
    pub uri: String,

    /// Optional caption
    pub caption: Option<String>,

    /// When the photo was taken or added
    pub timestamp: i64,
}

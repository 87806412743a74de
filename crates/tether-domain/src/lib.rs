//! Tether Domain Layer
//!
//! This crate contains the core domain model and logic for Tether. It has no
//! storage dependencies and defines the value types, pure computations, and
//! trait interfaces the other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **Entity**: a tracked person, group or topic
//! - **Interaction**: a timestamped event with an entity, weighted by its type
//! - **Score**: the decayed sum of an entity's interaction weights
//! - **Tag**: a label that decides which interaction types an entity is offered
//! - **Contact data**: structured phones, emails and addresses of a person
//!
//! ## Architecture
//!
//! - Pure logic only; persistence lives in `tether-store`
//! - Trait definitions for storage boundaries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contact;
pub mod dedup;
pub mod entity;
pub mod entity_type;
pub mod ids;
pub mod interaction;
pub mod passphrase;
pub mod resolver;
pub mod score;
pub mod tag;
pub mod traits;

// Re-exports for convenience
pub use contact::{ContactData, EmailAddress, PhoneNumber, PostalAddress, RepairOutcome};
pub use entity::{Entity, EntitySort, EntityUpdate, ListOptions, NewEntity, Photo};
pub use entity_type::EntityType;
pub use ids::{EntityId, InteractionId, InteractionTypeId, PhotoId, TagId};
pub use interaction::{
    ActivityBucket, Interaction, InteractionEdit, InteractionType, InteractionTypeTemplate,
    DEFAULT_COLOR,
};
pub use resolver::{resolve_interaction_types, ResolutionContext};
pub use score::{DecaySettings, DecayType, WeightedEvent};
pub use tag::Tag;
pub use traits::{EntityStore, MaintenanceAudit, MaintenanceStore, TagReconciliation};

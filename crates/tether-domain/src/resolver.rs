//! Interaction type resolution
//!
//! Decides which interaction categories are offered for an entity. The
//! store gathers the inputs (the entity's own tags, the tags it inherits
//! through group membership, and every known category); this module does
//! the selection so it can be tested without a database.

use std::collections::HashSet;

use crate::{EntityType, InteractionType, TagId};

/// Everything the resolver needs to know about one entity
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// The entity's type
    pub entity_type: EntityType,

    /// Tags applied directly to the entity
    pub direct_tags: Vec<TagId>,

    /// Tags inherited through membership: a group inherits its members'
    /// tags, a person inherits the tags of every group it belongs to
    pub inherited_tags: Vec<TagId>,
}

/// Select the interaction types available to an entity
///
/// Returns the union, de-duplicated by id, of:
/// - generic types (no tags, no restriction)
/// - types restricted to this entity's type
/// - types linked to one of the entity's own tags
/// - types linked to one of its inherited tags
///
/// Missing colors and weights are filled with defaults. The result is
/// sorted by name (case-insensitive), then id.
pub fn resolve_interaction_types(
    ctx: &ResolutionContext,
    all_types: &[InteractionType],
) -> Vec<InteractionType> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    let generic = all_types.iter().filter(|t| t.is_generic());
    let restricted = all_types.iter().filter(|t| t.restricted_to(ctx.entity_type));
    let direct = all_types.iter().filter(|t| t.linked_to_any(&ctx.direct_tags));
    let inherited = all_types.iter().filter(|t| t.linked_to_any(&ctx.inherited_tags));

    for t in generic.chain(restricted).chain(direct).chain(inherited) {
        if seen.insert(t.id) {
            resolved.push(t.clone().with_defaults());
        }
    }

    resolved.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InteractionTypeId;

    fn itype(id: i64, name: &str, tags: &[i64], types: &[EntityType]) -> InteractionType {
        InteractionType {
            id: InteractionTypeId::from_value(id),
            name: name.to_string(),
            icon: String::new(),
            entity_types: types.to_vec(),
            score: 1,
            color: "#000000".to_string(),
            tag_ids: tags.iter().map(|&t| TagId::from_value(t)).collect(),
        }
    }

    fn names(types: &[InteractionType]) -> Vec<&str> {
        types.iter().map(|t| t.name.as_str()).collect()
    }

    fn catalog() -> Vec<InteractionType> {
        vec![
            itype(1, "Call", &[], &[]),
            itype(2, "Group Outing", &[], &[EntityType::Group]),
            itype(3, "Climb", &[10], &[]),
            itype(4, "Rehearsal", &[20], &[]),
            itype(5, "Reading", &[], &[EntityType::Topic, EntityType::Person]),
            itype(6, "Unrelated", &[99], &[]),
        ]
    }

    #[test]
    fn test_person_with_direct_tag() {
        let ctx = ResolutionContext {
            entity_type: EntityType::Person,
            direct_tags: vec![TagId::from_value(10)],
            inherited_tags: vec![],
        };
        let resolved = resolve_interaction_types(&ctx, &catalog());
        assert_eq!(names(&resolved), vec!["Call", "Climb", "Reading"]);
    }

    #[test]
    fn test_group_inherits_member_tags() {
        let ctx = ResolutionContext {
            entity_type: EntityType::Group,
            direct_tags: vec![],
            inherited_tags: vec![TagId::from_value(20)],
        };
        let resolved = resolve_interaction_types(&ctx, &catalog());
        assert_eq!(names(&resolved), vec!["Call", "Group Outing", "Rehearsal"]);
    }

    #[test]
    fn test_duplicates_collapse_by_id() {
        let ctx = ResolutionContext {
            entity_type: EntityType::Person,
            direct_tags: vec![TagId::from_value(10)],
            inherited_tags: vec![TagId::from_value(10)],
        };
        let resolved = resolve_interaction_types(&ctx, &catalog());
        assert_eq!(resolved.iter().filter(|t| t.name == "Climb").count(), 1);
    }

    #[test]
    fn test_missing_metadata_defaulted() {
        let mut broken = itype(7, "Wave", &[], &[]);
        broken.color = String::new();
        broken.score = 0;
        let ctx = ResolutionContext {
            entity_type: EntityType::Topic,
            direct_tags: vec![],
            inherited_tags: vec![],
        };
        let resolved = resolve_interaction_types(&ctx, &[broken]);
        assert_eq!(resolved[0].color, crate::interaction::DEFAULT_COLOR);
        assert_eq!(resolved[0].score, 1);
    }
}

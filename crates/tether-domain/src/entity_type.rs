//! Entity type module - the three kinds of things Tether tracks

use std::fmt;

/// Kind of tracked entity
///
/// The type decides which interaction categories are offered and how
/// interactions propagate:
/// - Person: an individual; inherits tags from the groups it belongs to
/// - Group: a set of member entities; interactions fan out to every member
/// - Topic: a subject of interest with no membership semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    /// An individual
    Person,

    /// A collection of member entities
    Group,

    /// A subject or interest
    Topic,
}

impl EntityType {
    /// All entity types, in display order
    pub const ALL: [EntityType; 3] = [EntityType::Person, EntityType::Group, EntityType::Topic];

    /// Get the type name as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Group => "group",
            EntityType::Topic => "topic",
        }
    }

    /// Parse a type from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "person" => Some(EntityType::Person),
            "group" => Some(EntityType::Group),
            "topic" => Some(EntityType::Topic),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid entity type: {}", s))
    }
}

/// Parse a stored entity-type restriction
///
/// Restrictions are persisted either as a single type name (`"person"`), a
/// JSON array (`["person","group"]`) or a comma-separated list. Unknown
/// names are skipped. An empty result means "unrestricted".
pub fn parse_restriction(raw: &str) -> Vec<EntityType> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let names: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
    } else {
        raw.split(',').map(|s| s.to_string()).collect()
    };

    let mut types = Vec::new();
    for name in names {
        if let Some(t) = EntityType::parse(&name) {
            if !types.contains(&t) {
                types.push(t);
            }
        }
    }
    types
}

/// Format a restriction list for storage
///
/// Returns `None` for an unrestricted list, a bare name for a single type,
/// and a JSON array otherwise.
pub fn format_restriction(types: &[EntityType]) -> Option<String> {
    match types {
        [] => None,
        [single] => Some(single.as_str().to_string()),
        many => {
            let names: Vec<&str> = many.iter().map(|t| t.as_str()).collect();
            serde_json::to_string(&names).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for t in EntityType::ALL {
            assert_eq!(EntityType::parse(t.as_str()), Some(t));
        }
        assert_eq!(EntityType::parse(" Group "), Some(EntityType::Group));
        assert_eq!(EntityType::parse("organization"), None);
    }

    #[test]
    fn test_restriction_formats() {
        assert_eq!(parse_restriction("person"), vec![EntityType::Person]);
        assert_eq!(
            parse_restriction(r#"["person","group"]"#),
            vec![EntityType::Person, EntityType::Group]
        );
        assert_eq!(
            parse_restriction("topic, group"),
            vec![EntityType::Topic, EntityType::Group]
        );
        assert!(parse_restriction("").is_empty());
        assert!(parse_restriction("[not json").is_empty());
    }

    #[test]
    fn test_format_restriction() {
        assert_eq!(format_restriction(&[]), None);
        assert_eq!(format_restriction(&[EntityType::Topic]), Some("topic".to_string()));

        let stored = format_restriction(&[EntityType::Person, EntityType::Group]).unwrap();
        assert_eq!(parse_restriction(&stored), vec![EntityType::Person, EntityType::Group]);
    }
}

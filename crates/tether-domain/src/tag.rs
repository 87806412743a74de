//! Tags and the starter interaction types generated for new tags

use crate::interaction::InteractionTypeTemplate;
use crate::TagId;

/// A user-defined label applied to entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Unique identifier
    pub id: TagId,

    /// Name (unique, case-insensitive)
    pub name: String,

    /// Number of entities carrying the tag
    pub count: u32,
}

/// Normalize a tag name for storage
///
/// Trims and collapses internal whitespace. Returns `None` for names that
/// are blank after trimming.
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

struct Theme {
    keywords: &'static [&'static str],
    types: &'static [(&'static str, &'static str, u32, &'static str)],
}

const THEMES: &[Theme] = &[
    Theme {
        keywords: &["family", "relative", "parent", "sibling"],
        types: &[
            ("Family Dinner", "restaurant", 3, "#E91E63"),
            ("Visit", "home", 3, "#9C27B0"),
        ],
    },
    Theme {
        keywords: &["work", "colleague", "office", "job"],
        types: &[
            ("Work Meeting", "briefcase", 2, "#3F51B5"),
            ("Lunch", "restaurant", 2, "#FF9800"),
        ],
    },
    Theme {
        keywords: &["friend", "buddy", "pal"],
        types: &[
            ("Hangout", "people", 3, "#00BCD4"),
            ("Drinks", "wine", 2, "#795548"),
        ],
    },
    Theme {
        keywords: &["sport", "gym", "climb", "run", "fitness"],
        types: &[
            ("Workout", "barbell", 2, "#4CAF50"),
            ("Game", "trophy", 2, "#8BC34A"),
        ],
    },
    Theme {
        keywords: &["music", "band", "choir", "concert"],
        types: &[
            ("Jam Session", "musical-notes", 2, "#673AB7"),
            ("Concert", "ticket", 3, "#FF5722"),
        ],
    },
    Theme {
        keywords: &["book", "reading", "literature"],
        types: &[
            ("Book Club", "book", 2, "#607D8B"),
            ("Book Swap", "swap-horizontal", 1, "#009688"),
        ],
    },
];

/// Interaction types to create alongside a brand-new tag
///
/// The first theme whose keyword appears in the tag name wins. Unknown tags
/// get a "{Tag} Meetup" and "{Tag} Chat" pair.
pub fn starter_interaction_types(tag_name: &str) -> Vec<InteractionTypeTemplate> {
    let lowered = tag_name.to_lowercase();
    if let Some(theme) = THEMES
        .iter()
        .find(|t| t.keywords.iter().any(|k| lowered.contains(k)))
    {
        return theme
            .types
            .iter()
            .map(|(name, icon, score, color)| {
                InteractionTypeTemplate::new(*name, *icon)
                    .with_score(*score)
                    .with_color(*color)
            })
            .collect();
    }

    let display = capitalize(tag_name.trim());
    vec![
        InteractionTypeTemplate::new(format!("{} Meetup", display), "people").with_score(2),
        InteractionTypeTemplate::new(format!("{} Chat", display), "chatbubbles"),
    ]
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! Row identifiers
//!
//! Every persisted record is keyed by a SQLite rowid. Each table gets its own
//! newtype so an interaction id can never be passed where an entity id is
//! expected.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw rowid
            pub fn from_value(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw rowid
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|e| format!("Invalid {}: {}", stringify!($name), e))
            }
        }
    };
}

define_id!(
    /// Identifier of an [`Entity`](crate::Entity)
    EntityId
);
define_id!(
    /// Identifier of an [`Interaction`](crate::Interaction)
    InteractionId
);
define_id!(
    /// Identifier of an [`InteractionType`](crate::InteractionType)
    InteractionTypeId
);
define_id!(
    /// Identifier of a [`Tag`](crate::Tag)
    TagId
);
define_id!(
    /// Identifier of a [`Photo`](crate::Photo)
    PhotoId
);

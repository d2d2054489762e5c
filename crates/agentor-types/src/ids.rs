//! Newtype identifiers used throughout the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn nil() -> Self {
                Self(Uuid::nil())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

uuid_id!(TaskId);
uuid_id!(WorkerId);
uuid_id!(LockId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_are_generated() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn display_matches_inner_uuid() {
        let id = TaskId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}

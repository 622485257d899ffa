//! Identifier newtypes.
//!
//! Generated entities (patterns, synergies, suggestions, runs, query memories)
//! are keyed by a `Uuid`. Device- and entity-ids are externally assigned names
//! (e.g. `light.office`) and are validated non-empty strings instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(PatternId);
uuid_id!(SynergyId);
uuid_id!(SuggestionId);
uuid_id!(RunId);
uuid_id!(QueryMemoryId);
uuid_id!(SessionId);

/// A Home Assistant-style entity id, e.g. `light.office`.
///
/// Invariant: never empty. The domain is the prefix before the first `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// # Errors
    /// Returns `crate::Error::InvalidInput` if `value` is empty.
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(crate::Error::InvalidInput(
                "entity_id must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain is the prefix before the first `.`, or the whole id if there is none.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical device id, distinct from the (possibly several) entities it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// # Errors
    /// Returns `crate::Error::InvalidInput` if `value` is empty.
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(crate::Error::InvalidInput(
                "device_id must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_rejects_empty() {
        assert!(EntityId::new("").is_err());
    }

    #[test]
    fn entity_id_domain_is_prefix_before_dot() {
        let id = EntityId::new("light.office").unwrap();
        assert_eq!(id.domain(), "light");
    }

    #[test]
    fn entity_id_domain_falls_back_to_whole_string() {
        let id = EntityId::new("no_dot_here").unwrap();
        assert_eq!(id.domain(), "no_dot_here");
    }
}

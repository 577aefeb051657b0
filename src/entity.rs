//! Core Entity Trait and Errors
//!
//! Every record on the board has an identifier; every fallible
//! operation reports a `DomainError`.

use serde::{Deserialize, Serialize};

/// Core trait for board entities
pub trait Entity: Sized + Clone {
    /// The type of the entity's unique identifier
    type Id: Clone + Eq + std::hash::Hash;

    /// Returns the entity's identifier
    fn id(&self) -> &Self::Id;
}

/// Find an entity by id
pub fn find_by_id<'a, E: Entity>(entities: &'a [E], id: &E::Id) -> Option<&'a E> {
    entities.iter().find(|entity| entity.id() == id)
}

/// Index of an entity by id
pub fn position_by_id<E: Entity>(entities: &[E], id: &E::Id) -> Option<usize> {
    entities.iter().position(|entity| entity.id() == id)
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    NotFound(String),
    InvalidInput(String),
    Conflict(String),
    /// Transport failure talking to the remote store
    Network(String),
    Internal(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Network(msg) => write!(f, "Network error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: u32,
        text: &'static str,
    }

    impl Entity for Note {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let notes = vec![Note { id: 4, text: "a" }, Note { id: 9, text: "b" }];
        assert_eq!(find_by_id(&notes, &9).map(|note| note.text), Some("b"));
        assert_eq!(position_by_id(&notes, &4), Some(0));
        assert!(find_by_id(&notes, &1).is_none());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(DomainError::NotFound("task 7".into()).to_string(), "Not found: task 7");
        assert_eq!(DomainError::Network("timeout".into()).to_string(), "Network error: timeout");
    }

    #[test]
    fn test_error_serializes_with_variant_tag() {
        let json = serde_json::to_string(&DomainError::Conflict("stale".into())).unwrap();
        assert_eq!(json, r#"{"Conflict":"stale"}"#);
    }
}

//! Core identity types for scoped resources.
//!
//! All types use smart constructors so a value that exists is always valid,
//! following the "parse, don't validate" principle.

use nutype::nutype;
use uuid::Uuid;

/// Human-readable name of a scoped resource.
///
/// `ResourceName` values are trimmed, non-empty and at most 255 characters.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ResourceName(String);

/// Unique identifier of one acquired resource handle.
///
/// Handle identifiers are UUIDv7, which carry their creation time.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Creates a new `HandleId` with the current timestamp.
    pub fn new() -> Self {
        // Uuid::now_v7() always returns a v7 UUID
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_name_is_trimmed() {
        let name = ResourceName::try_new("  journal  ").unwrap();
        assert_eq!(name.as_ref(), "journal");
    }

    #[test]
    fn resource_name_rejects_blank_and_oversized_values() {
        assert!(ResourceName::try_new("").is_err());
        assert!(ResourceName::try_new("   ").is_err());
        assert!(ResourceName::try_new("x".repeat(256)).is_err());
        assert!(ResourceName::try_new("x".repeat(255)).is_ok());
    }

    #[test]
    fn handle_ids_are_unique() {
        let first = HandleId::new();
        let second = HandleId::new();
        assert_ne!(first, second);
    }

    #[test]
    fn handle_id_rejects_non_v7_uuids() {
        assert!(HandleId::try_new(Uuid::nil()).is_err());
    }
}

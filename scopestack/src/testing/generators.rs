//! Property test generators for scopestack types.
//!
//! Each generator respects the validation rules of the type it produces.

use proptest::prelude::*;

use crate::errors::ScopeError;
use crate::types::ResourceName;

/// Generates valid `ResourceName` values.
pub fn arb_resource_name() -> impl Strategy<Value = ResourceName> {
    "[a-z][a-z0-9_-]{0,31}".prop_filter_map("Invalid ResourceName", |s| ResourceName::try_new(s).ok())
}

/// Generates between 1 and `max` distinct resource names.
///
/// Names are distinct so a release log can be matched back to the
/// acquisition order.
pub fn arb_resource_names(max: usize) -> impl Strategy<Value = Vec<ResourceName>> {
    prop::collection::hash_set("[a-z]{1,12}", 1..=max.max(1)).prop_map(|names| {
        names
            .into_iter()
            .filter_map(|name| ResourceName::try_new(name).ok())
            .collect()
    })
}

/// Generates body failures with an arbitrary kind and message.
pub fn arb_processing_failure() -> impl Strategy<Value = ScopeError> {
    ("[A-Z][a-zA-Z]{0,15}Error", "[a-z ]{1,40}")
        .prop_map(|(kind, message)| ScopeError::processing_with_kind(kind, message))
}

/// Generates an optional body failure.
pub fn arb_body_outcome() -> impl Strategy<Value = Option<ScopeError>> {
    prop::option::of(arb_processing_failure())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_names_are_valid(name in arb_resource_name()) {
            prop_assert!(!name.as_ref().is_empty());
            prop_assert!(name.as_ref().len() <= 32);
        }

        #[test]
        fn generated_name_sets_are_distinct(names in arb_resource_names(8)) {
            let unique: std::collections::HashSet<_> = names.iter().collect();
            prop_assert_eq!(unique.len(), names.len());
            prop_assert!(!names.is_empty() && names.len() <= 8);
        }

        #[test]
        fn generated_failures_are_processing_failures(failure in arb_processing_failure()) {
            prop_assert!(failure.kind().ends_with("Error"));
            prop_assert!(!failure.is_invalid_state());
        }
    }
}

//! Scope configuration with type-safe validation.
//!
//! Configuration values use `nutype` validation so an invalid configuration
//! cannot be constructed. All types serialize with `serde` so a scope
//! configuration can be embedded in an application's own config file.

use nutype::nutype;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ScopeError;

/// Maximum number of resources a single stack may hold.
///
/// Validated to be between 1 and 1024 so a runaway registration loop fails
/// with a `DepthExceeded` error instead of exhausting file descriptors.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 1024),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct MaxScopeDepth(usize);

/// What happens to the pending failure when a release step itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReleasePolicy {
    /// The release failure becomes the pending failure and keeps the one it
    /// replaced as its source.
    #[default]
    Chain,
    /// The release failure becomes the pending failure; the replaced one is
    /// logged and dropped.
    Replace,
}

impl ReleasePolicy {
    /// Combines a release failure with the failure that was pending when it
    /// was raised.
    pub fn combine(self, release: ScopeError, pending: Option<ScopeError>) -> ScopeError {
        match self {
            Self::Chain => release.chained_onto(pending),
            Self::Replace => {
                if let Some(discarded) = pending {
                    warn!(
                        kind = discarded.kind(),
                        error = %discarded,
                        replaced_by = %release,
                        "discarding pending failure replaced by a release failure"
                    );
                }
                release
            }
        }
    }
}

/// Configuration of a [`ContextStack`](crate::stack::ContextStack).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Maximum number of resources the stack may hold.
    pub max_depth: MaxScopeDepth,
    /// How release failures combine with the pending failure.
    pub release_policy: ReleasePolicy,
    /// Whether a stack dropped without `exit` releases its open resources.
    pub unwind_on_drop: bool,
}

impl ScopeConfig {
    /// Create a scope configuration with safe defaults.
    ///
    /// # Errors
    ///
    /// Returns validation errors if any of the default values are invalid
    /// (which should never happen with proper constants).
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            max_depth: MaxScopeDepth::try_new(64)?,
            release_policy: ReleasePolicy::Chain,
            unwind_on_drop: true,
        })
    }

    /// Create a configuration for short-lived scopes that should never hold
    /// more than a handful of resources.
    pub fn strict() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            max_depth: MaxScopeDepth::try_new(16)?,
            release_policy: ReleasePolicy::Chain,
            unwind_on_drop: true,
        })
    }

    /// Set the maximum depth.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: MaxScopeDepth) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the release policy.
    #[must_use]
    pub const fn with_release_policy(mut self, release_policy: ReleasePolicy) -> Self {
        self.release_policy = release_policy;
        self
    }

    /// Leave open resources untouched when a stack is dropped without `exit`.
    #[must_use]
    pub const fn without_drop_unwind(mut self) -> Self {
        self.unwind_on_drop = false;
        self
    }

    /// The maximum depth as a plain count.
    pub fn depth_limit(&self) -> usize {
        self.max_depth.into_inner()
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self::new().expect("Default scope configuration should always be valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceName;

    #[test]
    fn test_depth_validation() {
        assert!(MaxScopeDepth::try_new(1).is_ok());
        assert!(MaxScopeDepth::try_new(1024).is_ok());

        assert!(MaxScopeDepth::try_new(0).is_err());
        assert!(MaxScopeDepth::try_new(1025).is_err());
    }

    #[test]
    fn test_presets() {
        let default = ScopeConfig::default();
        assert_eq!(default.depth_limit(), 64);
        assert_eq!(default.release_policy, ReleasePolicy::Chain);
        assert!(default.unwind_on_drop);

        let strict = ScopeConfig::strict().unwrap();
        assert_eq!(strict.depth_limit(), 16);
    }

    #[test]
    fn test_builder_methods() {
        let config = ScopeConfig::default()
            .with_max_depth(MaxScopeDepth::try_new(3).unwrap())
            .with_release_policy(ReleasePolicy::Replace)
            .without_drop_unwind();

        assert_eq!(config.depth_limit(), 3);
        assert_eq!(config.release_policy, ReleasePolicy::Replace);
        assert!(!config.unwind_on_drop);
    }

    #[test]
    fn test_serde_round_trip_rejects_invalid_depth() {
        let json = serde_json::to_string(&ScopeConfig::default()).unwrap();
        let parsed: ScopeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ScopeConfig::default());

        let invalid = json.replace("\"max_depth\":64", "\"max_depth\":0");
        assert!(serde_json::from_str::<ScopeConfig>(&invalid).is_err());
    }

    #[test]
    fn test_release_policies() {
        let resource = ResourceName::try_new("journal").unwrap();
        let body = ScopeError::processing("boom");
        let release = ScopeError::release(&resource, "close failed");

        let chained = ReleasePolicy::Chain.combine(release.clone(), Some(body.clone()));
        assert_eq!(chained.pending_failure(), Some(&body));

        let replaced = ReleasePolicy::Replace.combine(release.clone(), Some(body));
        assert_eq!(replaced, release);
    }
}

//! Error types for scopestack.
//!
//! A single error type, [`ScopeError`], describes every failure that can be
//! threaded through a scope's unwind pass. The error design follows these
//! principles:
//!
//! - **One failure record**: the pending failure seen by each release step is
//!   always a `ScopeError`, whatever raised it
//! - **Kind and message**: every failure exposes a stable kind string and a
//!   bare message, which is what release steps observe and log
//! - **No silent loss**: a release failure that replaces a pending failure
//!   keeps it reachable through [`std::error::Error::source`]
//!
//! # Error Categories
//!
//! - **Acquisition**: a resource failed to open; everything entered before it
//!   has already been released
//! - **Processing**: raised by body logic while resources are active
//! - **Release**: raised by a resource's own teardown
//! - **AlreadyReleased / InvalidState / DepthExceeded**: programming errors
//!   detected by the stack or by a handle's state machine
//!
//! # Example Usage
//!
//! ```rust
//! use scopestack::{ScopeError, PROCESSING_KIND};
//!
//! let failure = ScopeError::processing("boom");
//! assert_eq!(failure.kind(), PROCESSING_KIND);
//! assert_eq!(failure.message(), "boom");
//! ```

use crate::types::ResourceName;
use thiserror::Error;

/// Kind reported by [`ScopeError::processing`] failures.
pub const PROCESSING_KIND: &str = "ProcessingError";

/// Kind reported by acquisition failures.
pub const ACQUISITION_KIND: &str = "AcquisitionError";

/// Kind reported by release failures.
pub const RELEASE_KIND: &str = "ReleaseError";

/// Kind reported by state machine violations.
pub const INVALID_STATE_KIND: &str = "InvalidState";

/// Kind reported when the scope body panicked.
pub const PANIC_KIND: &str = "Panic";

/// Type alias for results of scope operations.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Failures that can occur while acquiring, using or releasing scoped resources.
///
/// # Error Handling Strategy
///
/// - **Acquisition**: fatal to the `enter` call; not retried
/// - **Processing**: observed by every remaining release step, then returned
///   to the caller of the scope unless a release step suppresses it
/// - **Release**: becomes the pending failure for the rest of the unwind,
///   combined with the previous one according to the
///   [`ReleasePolicy`](crate::config::ReleasePolicy)
/// - **AlreadyReleased / InvalidState**: indicates a bug in the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A resource could not be acquired.
    #[error("Resource acquisition failed for '{resource}': {message}")]
    Acquisition {
        /// The resource that failed to open
        resource: ResourceName,
        /// What went wrong
        message: String,
    },

    /// Body logic failed while resources were active.
    #[error("{kind}: {message}")]
    Processing {
        /// Failure kind, `ProcessingError` unless the body chose another
        kind: String,
        /// What went wrong
        message: String,
    },

    /// A resource's teardown step failed.
    #[error("Resource release failed for '{resource}': {message}")]
    Release {
        /// The resource whose teardown failed
        resource: ResourceName,
        /// What went wrong
        message: String,
        /// The failure that was pending when teardown failed, if kept
        #[source]
        pending: Option<Box<ScopeError>>,
    },

    /// A handle that is already closed was released again.
    #[error("Resource '{resource}' has already been released")]
    AlreadyReleased {
        /// The resource released twice
        resource: ResourceName,
    },

    /// An operation was attempted in a state that does not allow it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The stack refused to hold more resources.
    #[error("Scope depth limit of {max} resources exceeded")]
    DepthExceeded {
        /// The configured maximum depth
        max: usize,
    },

    /// The scope body panicked before the stack could be exited.
    #[error("Scope body panicked")]
    Panicked,
}

impl ScopeError {
    /// Creates an acquisition failure for `resource`.
    pub fn acquisition(resource: &ResourceName, message: impl Into<String>) -> Self {
        Self::Acquisition {
            resource: resource.clone(),
            message: message.into(),
        }
    }

    /// Creates a body failure of kind `ProcessingError`.
    pub fn processing(message: impl Into<String>) -> Self {
        Self::processing_with_kind(PROCESSING_KIND, message)
    }

    /// Creates a body failure with a custom kind.
    pub fn processing_with_kind(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processing {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a release failure for `resource` with no pending failure attached.
    pub fn release(resource: &ResourceName, message: impl Into<String>) -> Self {
        Self::Release {
            resource: resource.clone(),
            message: message.into(),
            pending: None,
        }
    }

    /// The failure kind, as observed by release steps.
    pub fn kind(&self) -> &str {
        match self {
            Self::Acquisition { .. } => ACQUISITION_KIND,
            Self::Processing { kind, .. } => kind,
            Self::Release { .. } => RELEASE_KIND,
            Self::AlreadyReleased { .. } | Self::InvalidState(_) | Self::DepthExceeded { .. } => {
                INVALID_STATE_KIND
            }
            Self::Panicked => PANIC_KIND,
        }
    }

    /// The bare failure message, without kind or resource prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Acquisition { message, .. }
            | Self::Processing { message, .. }
            | Self::Release { message, .. } => message.clone(),
            Self::AlreadyReleased { resource } => format!("'{resource}' has already been released"),
            Self::InvalidState(message) => message.clone(),
            Self::DepthExceeded { max } => format!("depth limit of {max} resources exceeded"),
            Self::Panicked => "scope body panicked".to_string(),
        }
    }

    /// The failure a release failure replaced, if it was kept.
    pub fn pending_failure(&self) -> Option<&Self> {
        match self {
            Self::Release {
                pending: Some(pending),
                ..
            } => Some(pending.as_ref()),
            _ => None,
        }
    }

    /// Follows the chain of replaced failures down to the first one raised.
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Some(previous) = current.pending_failure() {
            current = previous;
        }
        current
    }

    /// Returns `true` for failures that signal misuse of the stack rather than
    /// a failing resource or body.
    pub const fn is_invalid_state(&self) -> bool {
        matches!(
            self,
            Self::AlreadyReleased { .. } | Self::InvalidState(_) | Self::DepthExceeded { .. }
        )
    }

    /// Re-labels a failure raised by a factory as an acquisition failure of
    /// `resource`. Failures that already are acquisition failures are kept.
    pub(crate) fn into_acquisition(self, resource: &ResourceName) -> Self {
        match self {
            acquisition @ Self::Acquisition { .. } => acquisition,
            other => Self::acquisition(resource, other.to_string()),
        }
    }

    /// Re-labels a failure raised by a teardown step as a release failure of
    /// `resource`. Failures that already are release failures are kept.
    pub(crate) fn into_release(self, resource: &ResourceName) -> Self {
        match self {
            release @ Self::Release { .. } => release,
            other => Self::release(resource, other.to_string()),
        }
    }

    /// Attaches `previous` as the failure this release failure replaced.
    ///
    /// Only the innermost empty slot of the chain is filled, so a release
    /// failure that already carries a chain keeps it and gains `previous` at
    /// its end.
    pub(crate) fn chained_onto(self, previous: Option<Self>) -> Self {
        let Some(previous) = previous else {
            return self;
        };
        match self {
            Self::Release {
                resource,
                message,
                pending: None,
            } => Self::Release {
                resource,
                message,
                pending: Some(Box::new(previous)),
            },
            Self::Release {
                resource,
                message,
                pending: Some(inner),
            } => {
                let inner = match *inner {
                    release @ Self::Release { .. } => release.chained_onto(Some(previous)),
                    // a foreign leaf has no slot; keep its text and hang `previous` below it
                    leaf => Self::Release {
                        resource: resource.clone(),
                        message: leaf.to_string(),
                        pending: Some(Box::new(previous)),
                    },
                };
                Self::Release {
                    resource,
                    message,
                    pending: Some(Box::new(inner)),
                }
            }
            // callers relabel with `into_release` first
            other => other,
        }
    }
}

impl From<crate::types::ResourceNameError> for ScopeError {
    fn from(error: crate::types::ResourceNameError) -> Self {
        Self::InvalidState(format!("invalid resource name: {error}"))
    }
}

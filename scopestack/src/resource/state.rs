//! Lifecycle states of a resource handle
//!
//! ```text
//! Idle --activate--> Active --begin release--> Exiting --finish--> Closed
//! ```
//!
//! `Closed` is terminal. Any other transition is a programming error and is
//! reported, never swallowed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ScopeError, ScopeResult};
use crate::types::ResourceName;

/// Lifecycle state of a [`ResourceHandle`](super::ResourceHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleState {
    /// Created, resource not yet handed to the stack
    Idle,
    /// Resource acquired and usable
    Active,
    /// Release in progress
    Exiting,
    /// Released; the handle is dead
    Closed,
}

impl HandleState {
    /// Resource may be accessed
    pub const fn is_acquired(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Resource may be released
    pub const fn is_releasable(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Handle has reached its terminal state
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    const fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Active) | (Self::Active, Self::Exiting) | (Self::Exiting, Self::Closed)
        )
    }

    /// Validates the transition to `next` for the handle of `resource`.
    pub(crate) fn transition(self, next: Self, resource: &ResourceName) -> ScopeResult<Self> {
        if self.allows(next) {
            return Ok(next);
        }
        Err(match self {
            Self::Closed => ScopeError::AlreadyReleased {
                resource: resource.clone(),
            },
            Self::Exiting if next == Self::Exiting => ScopeError::InvalidState(format!(
                "release of '{resource}' re-entered while it was already exiting"
            )),
            _ => ScopeError::InvalidState(format!(
                "'{resource}' cannot move from {self} to {next}"
            )),
        })
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Exiting => "exiting",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

//! Scoped resource contract
//!
//! A scoped resource is acquired through a [`ResourceFactory`] and released
//! exactly once through its [`ScopedResource`] implementation. Release is
//! split in two steps so the ordering guarantee lives in the type rather than
//! in each implementation: [`ScopedResource::teardown`] always runs first, and
//! only once it has completed is [`ScopedResource::decide`] asked whether the
//! pending failure should be suppressed.
//!
//! # Example
//!
//! ```rust
//! use scopestack::{
//!     ContextStack, ExitDecision, ResourceFactory, ResourceName, ScopeError, ScopeResult,
//!     ScopedResource,
//! };
//!
//! struct Ledger {
//!     entries: Vec<String>,
//!     closed: bool,
//! }
//!
//! impl ScopedResource for Ledger {
//!     fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()> {
//!         if let Some(failure) = pending {
//!             self.entries.push(format!("aborted: {}", failure.kind()));
//!         }
//!         self.closed = true;
//!         Ok(())
//!     }
//! }
//!
//! struct OpenLedger;
//!
//! impl ResourceFactory for OpenLedger {
//!     type Resource = Ledger;
//!
//!     fn name(&self) -> ResourceName {
//!         ResourceName::try_new("ledger").expect("valid name")
//!     }
//!
//!     fn acquire(self) -> ScopeResult<Ledger> {
//!         Ok(Ledger { entries: Vec::new(), closed: false })
//!     }
//! }
//!
//! let mut stack = ContextStack::new();
//! let ledger = stack.enter(OpenLedger)?;
//! stack.get_mut(ledger)?.entries.push("opened".to_string());
//! stack.exit(None)?;
//! # Ok::<(), ScopeError>(())
//! ```

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::errors::{ScopeError, ScopeResult};
use crate::types::ResourceName;

mod function;
mod handle;
mod state;

pub use function::{from_fn, FnFactory, FnResource};
pub use handle::ResourceHandle;
pub(crate) use handle::ErasedHandle;
pub use state::HandleState;

/// Decision a release step renders about the pending failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExitDecision {
    /// Leave the pending failure in place for the remaining release steps
    /// and the caller.
    #[default]
    Propagate,
    /// Clear the pending failure for the rest of the unwind pass.
    Suppress,
}

impl ExitDecision {
    /// Builds a decision from a plain "suppress" flag.
    pub const fn from_suppress(suppress: bool) -> Self {
        if suppress {
            Self::Suppress
        } else {
            Self::Propagate
        }
    }

    /// Returns `true` when the pending failure is suppressed.
    pub const fn is_suppress(self) -> bool {
        matches!(self, Self::Suppress)
    }
}

/// Per-resource exit logic.
///
/// Implementations must not assume they are called without a pending
/// failure: `teardown` has to complete the resource's cleanup on every exit
/// path, and report its own failure through the returned error.
pub trait ScopedResource: Any {
    /// Mandatory cleanup. Runs exactly once per acquired resource.
    fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()>;

    /// Whether the pending failure should be suppressed. Only consulted after
    /// a successful teardown. Defaults to never suppressing.
    fn decide(&self, pending: Option<&ScopeError>) -> ExitDecision {
        let _ = pending;
        ExitDecision::Propagate
    }
}

/// Something that can acquire a scoped resource.
pub trait ResourceFactory {
    /// The resource produced on success.
    type Resource: ScopedResource;

    /// The name the acquired resource is tracked under.
    fn name(&self) -> ResourceName;

    /// Acquire the resource.
    ///
    /// Any error is reported to the caller of
    /// [`ContextStack::enter`](crate::stack::ContextStack::enter) as an
    /// acquisition failure of [`name`](Self::name).
    fn acquire(self) -> ScopeResult<Self::Resource>;
}

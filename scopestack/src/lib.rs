//! `scopestack` - scoped resource stack with deterministic release
//!
//! A [`ContextStack`] acquires resources one at a time and, when the scope
//! ends, releases them in the exact reverse order of acquisition. The failure
//! that ended the scope (if any) is threaded through every release step, each
//! of which performs its mandatory teardown and then decides whether the
//! failure keeps propagating.
//!
//! # Example
//!
//! ```rust
//! use scopestack::{resource, ContextStack, ResourceName, ScopeError};
//!
//! let outcome = ContextStack::scope_default(|stack| {
//!     let buffer = stack.enter(resource::from_fn(
//!         ResourceName::try_new("buffer").expect("valid name"),
//!         || Ok(Vec::<u8>::new()),
//!         |buffer: &mut Vec<u8>, _pending: Option<&ScopeError>| {
//!             buffer.clear();
//!             Ok(())
//!         },
//!     ))?;
//!     stack.get_mut(buffer)?.extend_from_slice(b"hello");
//!     Ok(stack.get(buffer)?.len())
//! });
//!
//! assert_eq!(outcome, Ok(Some(5)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod errors;
pub mod monitoring;
pub mod observer;
pub mod resource;
pub mod stack;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{MaxScopeDepth, ReleasePolicy, ScopeConfig};
pub use errors::{ScopeError, ScopeResult, PROCESSING_KIND};
pub use observer::{LifecycleEvent, LifecycleObserver, NoopObserver, ObserverSet, TracingObserver};
pub use resource::{
    from_fn, ExitDecision, FnFactory, FnResource, HandleState, ResourceFactory, ResourceHandle,
    ScopedResource,
};
pub use stack::{with_resource, ContextStack, Handle};
pub use types::{HandleId, ResourceName};

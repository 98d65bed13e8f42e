//! Testing utilities for scopestack.
//!
//! - [`probe`]: scripted resources that record when they are acquired and
//!   released, and can be told to fail or to suppress
//! - [`recording`]: an observer that keeps every lifecycle event it receives
//! - [`generators`]: `proptest` strategies for names and failures
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use scopestack::testing::prelude::*;
//! use scopestack::ContextStack;
//!
//! let log = ReleaseLog::new();
//! let mut stack = ContextStack::new();
//! stack.enter(ProbeFactory::new("outer", &log))?;
//! stack.enter(ProbeFactory::new("inner", &log))?;
//! stack.exit(None)?;
//! assert_eq!(log.released_names(), vec!["inner", "outer"]);
//! ```

pub mod generators;
pub mod probe;
pub mod recording;

pub use probe::{ProbeFactory, ProbeResource, ReleaseLog};
pub use recording::{RecordedEvent, RecordingObserver};

/// Common imports for tests.
pub mod prelude {
    pub use super::generators::*;
    pub use super::probe::{ProbeFactory, ProbeResource, ReleaseLog};
    pub use super::recording::{RecordedEvent, RecordingObserver};
}

//! Lifecycle observation
//!
//! A stack reports what it does to a [`LifecycleObserver`] passed in by its
//! creator: acquisition, acquisition failure, the start and end of every
//! release step, release failures, suppressed failures and the end of the
//! scope. Observers never influence the unwind; they only watch it.

use std::sync::Arc;

use serde_json::json;

use crate::errors::ScopeError;
use crate::monitoring::logging::StructuredLogger;
use crate::resource::ExitDecision;
use crate::types::{HandleId, ResourceName};

/// A lifecycle event emitted by a [`ContextStack`](crate::stack::ContextStack).
#[derive(Debug, Clone, Copy)]
pub enum LifecycleEvent<'a> {
    /// A resource was acquired and pushed.
    Acquired {
        /// Handle id
        id: HandleId,
        /// Resource name
        name: &'a ResourceName,
        /// Number of resources on the stack after the push
        depth: usize,
    },
    /// A factory failed; the stack is about to unwind.
    AcquisitionFailed {
        /// Resource name
        name: &'a ResourceName,
        /// The acquisition failure
        error: &'a ScopeError,
    },
    /// A release step is starting.
    Releasing {
        /// Handle id
        id: HandleId,
        /// Resource name
        name: &'a ResourceName,
        /// The failure pending when the step starts
        pending: Option<&'a ScopeError>,
    },
    /// A release step completed its teardown.
    Released {
        /// Handle id
        id: HandleId,
        /// Resource name
        name: &'a ResourceName,
        /// What the resource decided about the pending failure
        decision: ExitDecision,
    },
    /// A release step failed.
    ReleaseFailed {
        /// Handle id
        id: HandleId,
        /// Resource name
        name: &'a ResourceName,
        /// The release failure
        error: &'a ScopeError,
    },
    /// A release step suppressed the pending failure.
    FailureSuppressed {
        /// Handle id
        id: HandleId,
        /// Resource name
        name: &'a ResourceName,
        /// The failure that was cleared
        failure: &'a ScopeError,
    },
    /// The unwind pass is over.
    ScopeExited {
        /// The failure returned to the caller, if any
        failure: Option<&'a ScopeError>,
    },
}

impl LifecycleEvent<'_> {
    /// Short operation label for the event.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Acquired { .. } => "acquire",
            Self::AcquisitionFailed { .. } => "acquire_failed",
            Self::Releasing { .. } => "release_start",
            Self::Released { .. } => "release_end",
            Self::ReleaseFailed { .. } => "release_failed",
            Self::FailureSuppressed { .. } => "failure_suppressed",
            Self::ScopeExited { .. } => "scope_exit",
        }
    }
}

/// Receives lifecycle events from a stack.
pub trait LifecycleObserver: Send + Sync {
    /// Called synchronously, in order, for every event.
    fn on_event(&self, event: &LifecycleEvent<'_>);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {
    fn on_event(&self, _event: &LifecycleEvent<'_>) {}
}

/// Forwards every event to several observers, in registration order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl ObserverSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer.
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers in the set.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl LifecycleObserver for ObserverSet {
    fn on_event(&self, event: &LifecycleEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

/// Renders lifecycle events as structured `tracing` records.
///
/// Acquisition and release are logged at debug level; failures observed or
/// raised during the unwind at warn level.
pub struct TracingObserver {
    logger: StructuredLogger,
}

impl TracingObserver {
    /// Creates an observer logging under the `scopestack` component.
    pub fn new() -> Self {
        Self::with_component("scopestack")
    }

    /// Creates an observer logging under a custom component name.
    pub fn with_component(component: &str) -> Self {
        Self {
            logger: StructuredLogger::new(component),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for TracingObserver {
    fn on_event(&self, event: &LifecycleEvent<'_>) {
        let operation = event.operation();
        match *event {
            LifecycleEvent::Acquired { id, name, depth } => self
                .logger
                .debug_entry(operation, "resource acquired")
                .with_field("handle_id", json!(id.to_string()))
                .with_field("resource", json!(name.as_ref()))
                .with_field("depth", json!(depth))
                .log(),
            LifecycleEvent::AcquisitionFailed { name, error } => self
                .logger
                .warn_entry(operation, "resource acquisition failed")
                .with_field("resource", json!(name.as_ref()))
                .with_error(&error.to_string())
                .log(),
            LifecycleEvent::Releasing { id, name, pending } => {
                let mut entry = self
                    .logger
                    .debug_entry(operation, "releasing resource")
                    .with_field("handle_id", json!(id.to_string()))
                    .with_field("resource", json!(name.as_ref()));
                if let Some(failure) = pending {
                    entry = entry
                        .with_field("pending_kind", json!(failure.kind()))
                        .with_field("pending_message", json!(failure.message()));
                }
                entry.log();
            }
            LifecycleEvent::Released { id, name, decision } => self
                .logger
                .debug_entry(operation, "resource released")
                .with_field("handle_id", json!(id.to_string()))
                .with_field("resource", json!(name.as_ref()))
                .with_field("suppress", json!(decision.is_suppress()))
                .log(),
            LifecycleEvent::ReleaseFailed { id, name, error } => self
                .logger
                .warn_entry(operation, "resource release failed")
                .with_field("handle_id", json!(id.to_string()))
                .with_field("resource", json!(name.as_ref()))
                .with_error(&error.to_string())
                .log(),
            LifecycleEvent::FailureSuppressed { id, name, failure } => self
                .logger
                .warn_entry(operation, "pending failure suppressed")
                .with_field("handle_id", json!(id.to_string()))
                .with_field("resource", json!(name.as_ref()))
                .with_field("kind", json!(failure.kind()))
                .with_error(&failure.message())
                .log(),
            LifecycleEvent::ScopeExited { failure } => match failure {
                Some(failure) => self
                    .logger
                    .warn_entry(operation, "scope exited with a failure")
                    .with_field("kind", json!(failure.kind()))
                    .with_error(&failure.to_string())
                    .log(),
                None => self.logger.debug_entry(operation, "scope exited cleanly").log(),
            },
        }
    }
}

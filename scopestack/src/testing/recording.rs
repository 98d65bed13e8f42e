//! Observer that records lifecycle events.

use std::sync::{Mutex, PoisonError};

use crate::errors::ScopeError;
use crate::observer::{LifecycleEvent, LifecycleObserver};
use crate::resource::ExitDecision;
use crate::types::ResourceName;

/// Owned copy of a [`LifecycleEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    /// See [`LifecycleEvent::Acquired`]
    Acquired {
        /// Resource name
        name: ResourceName,
        /// Depth after the push
        depth: usize,
    },
    /// See [`LifecycleEvent::AcquisitionFailed`]
    AcquisitionFailed {
        /// Resource name
        name: ResourceName,
        /// The failure
        error: ScopeError,
    },
    /// See [`LifecycleEvent::Releasing`]
    Releasing {
        /// Resource name
        name: ResourceName,
        /// Pending failure at the start of the step
        pending: Option<ScopeError>,
    },
    /// See [`LifecycleEvent::Released`]
    Released {
        /// Resource name
        name: ResourceName,
        /// The decision rendered
        decision: ExitDecision,
    },
    /// See [`LifecycleEvent::ReleaseFailed`]
    ReleaseFailed {
        /// Resource name
        name: ResourceName,
        /// The failure
        error: ScopeError,
    },
    /// See [`LifecycleEvent::FailureSuppressed`]
    FailureSuppressed {
        /// Resource name
        name: ResourceName,
        /// The cleared failure
        failure: ScopeError,
    },
    /// See [`LifecycleEvent::ScopeExited`]
    ScopeExited {
        /// Failure returned to the caller
        failure: Option<ScopeError>,
    },
}

impl RecordedEvent {
    /// Same label as [`LifecycleEvent::operation`].
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

    /// Resource the event is about, if any.
    pub const fn resource(&self) -> Option<&ResourceName> {
        match self {
            Self::Acquired { name, .. }
            | Self::AcquisitionFailed { name, .. }
            | Self::Releasing { name, .. }
            | Self::Released { name, .. }
            | Self::ReleaseFailed { name, .. }
            | Self::FailureSuppressed { name, .. } => Some(name),
            Self::ScopeExited { .. } => None,
        }
    }
}

impl From<&LifecycleEvent<'_>> for RecordedEvent {
    fn from(event: &LifecycleEvent<'_>) -> Self {
        match *event {
            LifecycleEvent::Acquired { name, depth, .. } => Self::Acquired {
                name: name.clone(),
                depth,
            },
            LifecycleEvent::AcquisitionFailed { name, error } => Self::AcquisitionFailed {
                name: name.clone(),
                error: error.clone(),
            },
            LifecycleEvent::Releasing { name, pending, .. } => Self::Releasing {
                name: name.clone(),
                pending: pending.cloned(),
            },
            LifecycleEvent::Released { name, decision, .. } => Self::Released {
                name: name.clone(),
                decision,
            },
            LifecycleEvent::ReleaseFailed { name, error, .. } => Self::ReleaseFailed {
                name: name.clone(),
                error: error.clone(),
            },
            LifecycleEvent::FailureSuppressed { name, failure, .. } => Self::FailureSuppressed {
                name: name.clone(),
                failure: failure.clone(),
            },
            LifecycleEvent::ScopeExited { failure } => Self::ScopeExited {
                failure: failure.cloned(),
            },
        }
    }
}

/// Keeps every event it observes, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resource names in the order their release started.
    pub fn release_order(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                RecordedEvent::Releasing { name, .. } => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_event(&self, event: &LifecycleEvent<'_>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent::from(event));
    }
}

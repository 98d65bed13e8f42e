//! Open-handle tracking and leak detection
//!
//! [`ResourceLeakDetector`] is a [`LifecycleObserver`] that remembers every
//! handle acquired and forgets it once its release step has run (whether
//! teardown succeeded or not). Whatever is left after a scope ends was never
//! released.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::observer::{LifecycleEvent, LifecycleObserver};
use crate::types::{HandleId, ResourceName};

/// A handle seen acquired but not yet released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenHandle {
    /// Handle id
    pub id: HandleId,
    /// Resource name
    pub name: ResourceName,
    /// When the stack pushed it
    pub acquired_at: Instant,
}

/// Tracks handles between their acquisition and their release step.
#[derive(Debug, Default)]
pub struct ResourceLeakDetector {
    open: Mutex<HashMap<HandleId, OpenHandle>>,
}

impl ResourceLeakDetector {
    /// Detector with nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<HandleId, OpenHandle>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handles still open, oldest first.
    pub fn open_handles(&self) -> Vec<OpenHandle> {
        let mut handles: Vec<OpenHandle> = self.guard().values().cloned().collect();
        handles.sort_by_key(|handle| (handle.acquired_at, handle.id));
        handles
    }

    /// Whether every acquired handle has had its release step.
    pub fn is_clean(&self) -> bool {
        self.guard().is_empty()
    }

    /// Summary of what is open right now.
    pub fn stats(&self) -> ResourceLeakStats {
        self.open_handles()
            .iter()
            .fold(ResourceLeakStats::default(), |mut stats, handle| {
                stats.total_active += 1;
                *stats.by_name.entry(handle.name.to_string()).or_default() += 1;
                stats.oldest_resource_age = stats
                    .oldest_resource_age
                    .max(handle.acquired_at.elapsed());
                stats
            })
    }

    /// Open handles held longer than `threshold`, oldest first.
    pub fn held_longer_than(&self, threshold: Duration) -> Vec<OpenHandle> {
        self.open_handles()
            .into_iter()
            .filter(|handle| handle.acquired_at.elapsed() > threshold)
            .collect()
    }
}

impl LifecycleObserver for ResourceLeakDetector {
    fn on_event(&self, event: &LifecycleEvent<'_>) {
        match *event {
            LifecycleEvent::Acquired { id, name, .. } => {
                self.guard().insert(
                    id,
                    OpenHandle {
                        id,
                        name: name.clone(),
                        acquired_at: Instant::now(),
                    },
                );
            }
            // a failed teardown still closes the handle
            LifecycleEvent::Released { id, .. } | LifecycleEvent::ReleaseFailed { id, .. } => {
                self.guard().remove(&id);
            }
            _ => {}
        }
    }
}

/// Open handles at a point in time.
#[derive(Debug, Default)]
pub struct ResourceLeakStats {
    /// Total number of open handles
    pub total_active: usize,
    /// Count of open handles by resource name
    pub by_name: HashMap<String, usize>,
    /// Age of the oldest open handle
    pub oldest_resource_age: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScopeError;
    use crate::resource::ExitDecision;
    use crate::stack::ContextStack;
    use crate::testing::{ProbeFactory, ReleaseLog};
    use std::sync::Arc;

    fn acquired(detector: &ResourceLeakDetector, id: HandleId, name: &ResourceName) {
        detector.on_event(&LifecycleEvent::Acquired { id, name, depth: 1 });
    }

    #[test]
    fn test_events_open_and_close_handles() {
        let detector = ResourceLeakDetector::new();
        let journal = ResourceName::try_new("journal").unwrap();
        let source = ResourceName::try_new("source").unwrap();
        assert_eq!(detector.stats().total_active, 0);

        let first = HandleId::new();
        let second = HandleId::new();
        let third = HandleId::new();
        acquired(&detector, first, &journal);
        acquired(&detector, second, &journal);
        acquired(&detector, third, &source);

        let stats = detector.stats();
        assert_eq!(stats.total_active, 3);
        assert_eq!(stats.by_name.get("journal"), Some(&2));
        assert_eq!(stats.by_name.get("source"), Some(&1));

        detector.on_event(&LifecycleEvent::Released {
            id: first,
            name: &journal,
            decision: ExitDecision::Propagate,
        });
        let failure = ScopeError::release(&journal, "flush failed");
        detector.on_event(&LifecycleEvent::ReleaseFailed {
            id: second,
            name: &journal,
            error: &failure,
        });
        assert_eq!(detector.stats().by_name.get("journal"), None);

        std::thread::sleep(Duration::from_millis(2));
        // nothing has been open for a second yet
        assert!(detector.held_longer_than(Duration::from_secs(1)).is_empty());
        assert_eq!(detector.held_longer_than(Duration::ZERO).len(), 1);
        assert!(!detector.is_clean());
    }

    #[test]
    fn test_detector_follows_a_stack() {
        let detector = Arc::new(ResourceLeakDetector::new());
        let log = ReleaseLog::new();

        let mut stack = ContextStack::with_observer(detector.clone());
        stack.enter(ProbeFactory::new("first", &log)).unwrap();
        stack.enter(ProbeFactory::new("second", &log).failing_teardown()).unwrap();
        assert_eq!(detector.stats().total_active, 2);

        let outcome = stack.exit(None);
        assert!(outcome.is_err());
        assert!(detector.is_clean());
    }
}

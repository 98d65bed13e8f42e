//! Scripted probe resources.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{ScopeError, ScopeResult};
use crate::resource::{ExitDecision, ResourceFactory, ScopedResource};
use crate::types::ResourceName;

const PROBE_KIND: &str = "ProbeError";

#[derive(Debug, Default)]
struct LogState {
    acquired: Vec<String>,
    released: Vec<(String, Option<ScopeError>)>,
}

/// Shared record of what probes did, in the order they did it.
///
/// Cloning gives another view of the same log.
#[derive(Debug, Clone, Default)]
pub struct ReleaseLog {
    state: Arc<Mutex<LogState>>,
}

impl ReleaseLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Names of successfully acquired probes, in acquisition order.
    pub fn acquired_names(&self) -> Vec<String> {
        self.state().acquired.clone()
    }

    /// Names of probes whose teardown ran, in release order.
    pub fn released_names(&self) -> Vec<String> {
        self.state()
            .released
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// How many times teardown ran for `name`.
    pub fn teardown_count(&self, name: &str) -> usize {
        self.state()
            .released
            .iter()
            .filter(|(released, _)| released == name)
            .count()
    }

    /// Pending failures observed by each teardown of `name`.
    pub fn pending_seen_by(&self, name: &str) -> Vec<Option<ScopeError>> {
        self.state()
            .released
            .iter()
            .filter(|(released, _)| released == name)
            .map(|(_, pending)| pending.clone())
            .collect()
    }

    fn record_acquired(&self, name: &ResourceName) {
        self.state().acquired.push(name.to_string());
    }

    fn record_released(&self, name: &ResourceName, pending: Option<&ScopeError>) {
        self.state()
            .released
            .push((name.to_string(), pending.cloned()));
    }
}

/// Factory for a [`ProbeResource`].
#[derive(Debug, Clone)]
pub struct ProbeFactory {
    name: ResourceName,
    log: ReleaseLog,
    fail_acquire: bool,
    fail_teardown: bool,
    suppress: bool,
}

impl ProbeFactory {
    /// A probe that acquires, releases and propagates without failing.
    ///
    /// # Panics
    ///
    /// If `name` is not a valid resource name.
    pub fn new(name: &str, log: &ReleaseLog) -> Self {
        Self {
            name: ResourceName::try_new(name).expect("probe names must be valid resource names"),
            log: log.clone(),
            fail_acquire: false,
            fail_teardown: false,
            suppress: false,
        }
    }

    /// Make acquisition fail.
    #[must_use]
    pub const fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    /// Make teardown fail (after it has been recorded).
    #[must_use]
    pub const fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    /// Make the probe suppress any pending failure.
    #[must_use]
    pub const fn suppressing(mut self) -> Self {
        self.suppress = true;
        self
    }
}

impl ResourceFactory for ProbeFactory {
    type Resource = ProbeResource;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<ProbeResource> {
        if self.fail_acquire {
            return Err(ScopeError::processing_with_kind(
                PROBE_KIND,
                "scripted acquisition failure",
            ));
        }
        self.log.record_acquired(&self.name);
        Ok(ProbeResource {
            name: self.name,
            log: self.log,
            fail_teardown: self.fail_teardown,
            suppress: self.suppress,
        })
    }
}

/// A resource that only records its own release.
#[derive(Debug)]
pub struct ProbeResource {
    name: ResourceName,
    log: ReleaseLog,
    fail_teardown: bool,
    suppress: bool,
}

impl ProbeResource {
    /// The probe's name.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

impl ScopedResource for ProbeResource {
    fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()> {
        self.log.record_released(&self.name, pending);
        if self.fail_teardown {
            return Err(ScopeError::processing_with_kind(
                PROBE_KIND,
                "scripted teardown failure",
            ));
        }
        Ok(())
    }

    fn decide(&self, _pending: Option<&ScopeError>) -> ExitDecision {
        ExitDecision::from_suppress(self.suppress)
    }
}

//! Resource handles and their exit interceptor

use std::any::Any;

use super::{ExitDecision, HandleState, ScopedResource};
use crate::errors::{ScopeError, ScopeResult};
use crate::types::{HandleId, ResourceName};

/// An acquired resource together with its identity and lifecycle state.
///
/// The handle owns the resource exclusively. Release goes through
/// [`release`](Self::release), which drives the state machine so that
/// teardown runs at most once, whatever the caller does.
#[derive(Debug)]
pub struct ResourceHandle<R> {
    id: HandleId,
    name: ResourceName,
    resource: R,
    state: HandleState,
}

impl<R: ScopedResource> ResourceHandle<R> {
    /// Wrap a freshly acquired resource. The handle starts `Idle`.
    pub fn new(name: ResourceName, resource: R) -> Self {
        Self {
            id: HandleId::new(),
            name,
            resource,
            state: HandleState::Idle,
        }
    }

    /// Unique id of this handle
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Name the resource is tracked under
    pub const fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Current lifecycle state
    pub const fn state(&self) -> HandleState {
        self.state
    }

    /// Mark the resource as handed over to its scope.
    pub fn activate(&mut self) -> ScopeResult<()> {
        self.state = self.state.transition(HandleState::Active, &self.name)?;
        Ok(())
    }

    /// Access the resource. Only available while the handle is active.
    pub fn get(&self) -> ScopeResult<&R> {
        self.ensure_acquired()?;
        Ok(&self.resource)
    }

    /// Mutable access to the resource. Only available while the handle is active.
    pub fn get_mut(&mut self) -> ScopeResult<&mut R> {
        self.ensure_acquired()?;
        Ok(&mut self.resource)
    }

    /// Run the exit interceptor: teardown first, then the suppress decision.
    ///
    /// The handle is `Closed` afterwards even when teardown fails, so a second
    /// call returns [`ScopeError::AlreadyReleased`] without touching the
    /// resource again. Teardown failures are reported as release failures of
    /// this handle's resource.
    pub fn release(&mut self, pending: Option<&ScopeError>) -> ScopeResult<ExitDecision> {
        self.state = self.state.transition(HandleState::Exiting, &self.name)?;
        let torn_down = self.resource.teardown(pending);
        self.state = self.state.transition(HandleState::Closed, &self.name)?;

        torn_down.map_err(|error| error.into_release(&self.name))?;
        Ok(self.resource.decide(pending))
    }

    fn ensure_acquired(&self) -> ScopeResult<()> {
        if self.state.is_acquired() {
            Ok(())
        } else {
            Err(ScopeError::InvalidState(format!(
                "'{}' is {} and cannot be used",
                self.name, self.state
            )))
        }
    }
}

/// Type-erased view of a handle, as stored on a stack.
pub(crate) trait ErasedHandle {
    fn id(&self) -> HandleId;
    fn name(&self) -> &ResourceName;
    fn release(&mut self, pending: Option<&ScopeError>) -> ScopeResult<ExitDecision>;
    fn resource_any(&self) -> ScopeResult<&dyn Any>;
    fn resource_any_mut(&mut self) -> ScopeResult<&mut dyn Any>;
}

impl<R: ScopedResource> ErasedHandle for ResourceHandle<R> {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn release(&mut self, pending: Option<&ScopeError>) -> ScopeResult<ExitDecision> {
        Self::release(self, pending)
    }

    fn resource_any(&self) -> ScopeResult<&dyn Any> {
        Ok(self.get()?)
    }

    fn resource_any_mut(&mut self) -> ScopeResult<&mut dyn Any> {
        Ok(self.get_mut()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ProbeFactory, ReleaseLog};
    use crate::resource::ResourceFactory;

    fn active_probe(log: &ReleaseLog) -> ResourceHandle<crate::testing::ProbeResource> {
        let factory = ProbeFactory::new("probe", log);
        let name = factory.name();
        let mut handle = ResourceHandle::new(name, factory.acquire().unwrap());
        handle.activate().unwrap();
        handle
    }

    #[test]
    fn release_closes_the_handle_and_propagates_by_default() {
        let log = ReleaseLog::new();
        let mut handle = active_probe(&log);

        let decision = handle.release(None).unwrap();
        assert_eq!(decision, ExitDecision::Propagate);
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(log.released_names(), vec!["probe"]);
    }

    #[test]
    fn second_release_is_detected_and_never_tears_down_twice() {
        let log = ReleaseLog::new();
        let mut handle = active_probe(&log);

        handle.release(None).unwrap();
        let err = handle.release(None).unwrap_err();

        assert!(matches!(err, ScopeError::AlreadyReleased { .. }));
        assert_eq!(log.teardown_count("probe"), 1);
    }

    #[test]
    fn failed_teardown_still_closes_the_handle() {
        let log = ReleaseLog::new();
        let factory = ProbeFactory::new("flaky", &log).failing_teardown();
        let mut handle = ResourceHandle::new(factory.name(), factory.acquire().unwrap());
        handle.activate().unwrap();

        let err = handle.release(None).unwrap_err();
        assert_eq!(err.kind(), "ReleaseError");
        assert_eq!(handle.state(), HandleState::Closed);
        assert!(matches!(
            handle.release(None),
            Err(ScopeError::AlreadyReleased { .. })
        ));
        assert_eq!(log.teardown_count("flaky"), 1);
    }

    #[test]
    fn resource_is_unreachable_outside_the_active_state() {
        let log = ReleaseLog::new();
        let factory = ProbeFactory::new("probe", &log);
        let mut handle = ResourceHandle::new(factory.name(), factory.acquire().unwrap());
        assert!(handle.get().is_err());

        handle.activate().unwrap();
        assert!(handle.get().is_ok());

        handle.release(None).unwrap();
        assert!(handle.get_mut().is_err());
    }

    #[test]
    fn pending_failure_reaches_teardown_and_decision() {
        let log = ReleaseLog::new();
        let factory = ProbeFactory::new("guard", &log).suppressing();
        let mut handle = ResourceHandle::new(factory.name(), factory.acquire().unwrap());
        handle.activate().unwrap();

        let failure = ScopeError::processing("boom");
        let decision = handle.release(Some(&failure)).unwrap();

        assert_eq!(decision, ExitDecision::Suppress);
        assert_eq!(log.pending_seen_by("guard"), vec![Some(failure)]);
    }
}

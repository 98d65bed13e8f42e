//! Function-style scoped resources
//!
//! [`from_fn`] turns a setup closure and a cleanup closure into a resource
//! factory: setup produces the value, and cleanup runs on every exit path of
//! the scope the value was entered into.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use super::{ResourceFactory, ScopedResource};
use crate::errors::{ScopeError, ScopeResult};
use crate::types::ResourceName;

/// Factory built by [`from_fn`].
pub struct FnFactory<T, S, C> {
    name: ResourceName,
    setup: S,
    cleanup: C,
    _value: PhantomData<fn() -> T>,
}

/// Resource built by [`from_fn`]; dereferences to the value produced by setup.
pub struct FnResource<T, C> {
    value: T,
    cleanup: Option<C>,
}

/// Build a resource from a setup step and a guaranteed cleanup step.
///
/// `setup` runs when the factory is entered into a stack; its error is an
/// acquisition failure. `cleanup` receives the value and the pending failure
/// and runs exactly once, whether the scope ends normally or not. The
/// resulting resource never suppresses failures.
///
/// # Example
///
/// ```rust
/// use scopestack::{from_fn, ContextStack, ResourceName, ScopeError};
/// use std::sync::{Arc, Mutex};
///
/// let cleaned = Arc::new(Mutex::new(Vec::new()));
/// let seen = Arc::clone(&cleaned);
///
/// let result: Result<Option<()>, ScopeError> = ContextStack::scope_default(|stack| {
///     stack.enter(from_fn(
///         ResourceName::try_new("scratch").expect("valid name"),
///         || Ok(String::from("scratch data")),
///         move |_value: &mut String, pending: Option<&ScopeError>| {
///             seen.lock().unwrap().push(pending.map(ScopeError::kind).map(str::to_owned));
///             Ok(())
///         },
///     ))?;
///     Err(ScopeError::processing("boom"))
/// });
///
/// assert_eq!(result, Err(ScopeError::processing("boom")));
/// assert_eq!(*cleaned.lock().unwrap(), vec![Some("ProcessingError".to_string())]);
/// ```
pub fn from_fn<T, S, C>(name: ResourceName, setup: S, cleanup: C) -> FnFactory<T, S, C>
where
    T: 'static,
    S: FnOnce() -> ScopeResult<T>,
    C: FnOnce(&mut T, Option<&ScopeError>) -> ScopeResult<()> + 'static,
{
    FnFactory {
        name,
        setup,
        cleanup,
        _value: PhantomData,
    }
}

impl<T, S, C> ResourceFactory for FnFactory<T, S, C>
where
    T: 'static,
    S: FnOnce() -> ScopeResult<T>,
    C: FnOnce(&mut T, Option<&ScopeError>) -> ScopeResult<()> + 'static,
{
    type Resource = FnResource<T, C>;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<Self::Resource> {
        let value = (self.setup)()?;
        Ok(FnResource {
            value,
            cleanup: Some(self.cleanup),
        })
    }
}

impl<T, C> ScopedResource for FnResource<T, C>
where
    T: 'static,
    C: FnOnce(&mut T, Option<&ScopeError>) -> ScopeResult<()> + 'static,
{
    fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()> {
        let cleanup = self
            .cleanup
            .take()
            .ok_or_else(|| ScopeError::InvalidState("cleanup has already run".to_string()))?;
        cleanup(&mut self.value, pending)
    }
}

impl<T, C> Deref for FnResource<T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, C> DerefMut for FnResource<T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::ContextStack;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn name(value: &str) -> ResourceName {
        ResourceName::try_new(value).unwrap()
    }

    #[test]
    fn cleanup_runs_once_on_success() {
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);

        let mut stack = ContextStack::new();
        let handle = stack
            .enter(from_fn(
                name("counter"),
                || Ok(1_u32),
                move |value: &mut u32, pending: Option<&ScopeError>| {
                    assert!(pending.is_none());
                    *counter.borrow_mut() += *value;
                    Ok(())
                },
            ))
            .unwrap();
        **stack.get_mut(handle).unwrap() += 1;
        stack.exit(None).unwrap();

        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn setup_failure_is_an_acquisition_failure() {
        let mut stack = ContextStack::new();
        let err = stack
            .enter(from_fn(
                name("broken"),
                || -> ScopeResult<u32> { Err(ScopeError::processing_with_kind("IoError", "missing")) },
                |_value: &mut u32, _pending: Option<&ScopeError>| Ok(()),
            ))
            .err()
            .unwrap();

        assert_eq!(err.kind(), "AcquisitionError");
        assert_eq!(err.message(), "IoError: missing");
    }

    #[test]
    fn cleanup_failure_is_a_release_failure() {
        let mut stack = ContextStack::new();
        stack
            .enter(from_fn(
                name("sticky"),
                || Ok(()),
                |_value: &mut (), _pending: Option<&ScopeError>| {
                    Err(ScopeError::processing("still busy"))
                },
            ))
            .unwrap();

        let err = stack.exit(None).unwrap_err();
        assert_eq!(err.kind(), "ReleaseError");
        assert_eq!(err.to_string(), "Resource release failed for 'sticky': ProcessingError: still busy");
    }
}

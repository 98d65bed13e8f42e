//! The context stack
//!
//! A [`ContextStack`] owns every resource entered into it and releases them
//! in the exact reverse order of acquisition. The failure that ended the
//! scope is threaded through each release step; a step may suppress it, and
//! a failing step replaces it according to the configured
//! [`ReleasePolicy`](crate::config::ReleasePolicy).

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::ScopeConfig;
use crate::errors::{ScopeError, ScopeResult};
use crate::observer::{LifecycleEvent, LifecycleObserver, TracingObserver};
use crate::resource::{ErasedHandle, ExitDecision, ResourceFactory, ResourceHandle, ScopedResource};
use crate::types::{HandleId, ResourceName};

/// Typed key to a resource held by a [`ContextStack`].
///
/// Returned by [`ContextStack::enter`]; only valid for the stack that issued
/// it.
pub struct Handle<R> {
    id: HandleId,
    index: usize,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Handle<R> {
    /// Id of the handle this key points to
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Position on the stack, 0 being the first resource entered
    pub const fn position(&self) -> usize {
        self.index
    }
}

impl<R> Clone for Handle<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Handle<R> {}

impl<R> fmt::Debug for Handle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish()
    }
}

/// Ordered collection of acquired resources with LIFO release.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use scopestack::{ContextStack, ResourceName, ScopeError};
///
/// let released = Rc::new(RefCell::new(Vec::new()));
/// let mut stack = ContextStack::new();
/// for label in ["first", "second"] {
///     let released = Rc::clone(&released);
///     stack.defer(ResourceName::try_new(label)?, move |_pending: Option<&ScopeError>| {
///         released.borrow_mut().push(label);
///         Ok(())
///     })?;
/// }
/// stack.exit(None)?;
///
/// assert_eq!(*released.borrow(), vec!["second", "first"]);
/// # Ok::<(), ScopeError>(())
/// ```
pub struct ContextStack {
    handles: Vec<Box<dyn ErasedHandle>>,
    config: ScopeConfig,
    observer: Arc<dyn LifecycleObserver>,
    closed: bool,
}

impl ContextStack {
    /// Empty stack with the default configuration, logging through `tracing`.
    pub fn new() -> Self {
        Self::with_config(ScopeConfig::default(), Arc::new(TracingObserver::new()))
    }

    /// Empty stack with the default configuration and a custom observer.
    pub fn with_observer(observer: Arc<dyn LifecycleObserver>) -> Self {
        Self::with_config(ScopeConfig::default(), observer)
    }

    /// Empty stack with explicit configuration and observer.
    pub fn with_config(config: ScopeConfig, observer: Arc<dyn LifecycleObserver>) -> Self {
        Self {
            handles: Vec::new(),
            config,
            observer,
            closed: false,
        }
    }

    /// Run `body` over a fresh stack and always exit it.
    ///
    /// The body's error becomes the initial pending failure. Returns
    /// `Ok(Some(value))` when the body succeeded and every release step did
    /// too, `Ok(None)` when the body failed but a release step suppressed the
    /// failure, and `Err` with whatever failure was left pending otherwise.
    pub fn scope<T, F>(
        config: ScopeConfig,
        observer: Arc<dyn LifecycleObserver>,
        body: F,
    ) -> ScopeResult<Option<T>>
    where
        F: FnOnce(&mut Self) -> ScopeResult<T>,
    {
        let mut stack = Self::with_config(config, observer);
        match body(&mut stack) {
            Ok(value) => stack.exit(None).map(|()| Some(value)),
            Err(failure) => stack.exit(Some(failure)).map(|()| None),
        }
    }

    /// [`scope`](Self::scope) with the default configuration and observer.
    pub fn scope_default<T, F>(body: F) -> ScopeResult<Option<T>>
    where
        F: FnOnce(&mut Self) -> ScopeResult<T>,
    {
        Self::scope(
            ScopeConfig::default(),
            Arc::new(TracingObserver::new()),
            body,
        )
    }

    /// Acquire a resource and push it on the stack.
    ///
    /// # Errors
    ///
    /// - [`ScopeError::InvalidState`] if the stack is already closed
    /// - [`ScopeError::DepthExceeded`] if the stack is full
    /// - [`ScopeError::Acquisition`] if the factory failed
    ///
    /// The last two close the stack after releasing every resource already
    /// entered, in reverse order and with no pending failure. If one of those
    /// releases fails, the release failure is returned, combined with the
    /// original error through the release policy.
    pub fn enter<F>(&mut self, factory: F) -> ScopeResult<Handle<F::Resource>>
    where
        F: ResourceFactory,
    {
        if self.closed {
            return Err(ScopeError::InvalidState(
                "stack is closed and cannot accept new resources".to_string(),
            ));
        }

        let name = factory.name();
        let max = self.config.depth_limit();
        if self.handles.len() >= max {
            return Err(self.abort(ScopeError::DepthExceeded { max }));
        }

        let resource = match factory.acquire() {
            Ok(resource) => resource,
            Err(failure) => {
                let failure = failure.into_acquisition(&name);
                self.observer.on_event(&LifecycleEvent::AcquisitionFailed {
                    name: &name,
                    error: &failure,
                });
                return Err(self.abort(failure));
            }
        };

        let mut handle = ResourceHandle::new(name, resource);
        handle.activate()?;

        let key = Handle {
            id: handle.id(),
            index: self.handles.len(),
            _resource: PhantomData,
        };
        self.observer.on_event(&LifecycleEvent::Acquired {
            id: key.id,
            name: handle.name(),
            depth: key.index + 1,
        });
        self.handles.push(Box::new(handle));
        Ok(key)
    }

    /// Register a bare cleanup callback, released like any other resource.
    pub fn defer<C>(&mut self, name: ResourceName, cleanup: C) -> ScopeResult<Handle<Deferred<C>>>
    where
        C: FnOnce(Option<&ScopeError>) -> ScopeResult<()> + 'static,
    {
        self.enter(DeferFactory { name, cleanup })
    }

    /// Shared access to an entered resource.
    ///
    /// # Errors
    ///
    /// [`ScopeError::InvalidState`] if the key was issued by another stack or
    /// its resource is no longer active.
    pub fn get<R: ScopedResource>(&self, handle: Handle<R>) -> ScopeResult<&R> {
        self.locate(handle)?
            .resource_any()?
            .downcast_ref::<R>()
            .ok_or_else(|| mismatched(handle.id))
    }

    /// Exclusive access to an entered resource.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut<R: ScopedResource>(&mut self, handle: Handle<R>) -> ScopeResult<&mut R> {
        let index = self.position_of(handle)?;
        self.handles[index]
            .resource_any_mut()?
            .downcast_mut::<R>()
            .ok_or_else(|| mismatched(handle.id))
    }

    /// Number of resources currently held
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the stack holds no resource
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether the stack refuses new resources
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Names of the held resources, in acquisition order
    pub fn names(&self) -> Vec<&ResourceName> {
        self.handles.iter().map(|handle| handle.name()).collect()
    }

    /// Configuration of this stack
    pub const fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Release everything with no pending failure.
    ///
    /// # Errors
    ///
    /// The failure left pending after the last release step.
    pub fn close(self) -> ScopeResult<()> {
        self.exit(None)
    }

    /// Release every held resource in reverse acquisition order.
    ///
    /// `body_failure` is the initial pending failure. Each release step sees
    /// the current pending failure; a suppress decision clears it and a
    /// release failure replaces it.
    ///
    /// # Errors
    ///
    /// The failure left pending after the last release step.
    pub fn exit(mut self, body_failure: Option<ScopeError>) -> ScopeResult<()> {
        self.closed = true;
        self.unwind(body_failure).map_or(Ok(()), Err)
    }

    fn abort(&mut self, failure: ScopeError) -> ScopeError {
        self.closed = true;
        match self.unwind(None) {
            Some(release_failure) => self
                .config
                .release_policy
                .combine(release_failure, Some(failure)),
            None => failure,
        }
    }

    fn unwind(&mut self, initial: Option<ScopeError>) -> Option<ScopeError> {
        let mut pending = initial;

        while let Some(mut handle) = self.handles.pop() {
            let id = handle.id();
            let name = handle.name().clone();
            self.observer.on_event(&LifecycleEvent::Releasing {
                id,
                name: &name,
                pending: pending.as_ref(),
            });

            match handle.release(pending.as_ref()) {
                Ok(decision) => {
                    self.observer.on_event(&LifecycleEvent::Released {
                        id,
                        name: &name,
                        decision,
                    });
                    if decision == ExitDecision::Suppress {
                        if let Some(failure) = pending.take() {
                            self.observer.on_event(&LifecycleEvent::FailureSuppressed {
                                id,
                                name: &name,
                                failure: &failure,
                            });
                        }
                    }
                }
                Err(failure) => {
                    let failure = failure.into_release(&name);
                    self.observer.on_event(&LifecycleEvent::ReleaseFailed {
                        id,
                        name: &name,
                        error: &failure,
                    });
                    pending = Some(self.config.release_policy.combine(failure, pending.take()));
                }
            }
        }

        self.observer.on_event(&LifecycleEvent::ScopeExited {
            failure: pending.as_ref(),
        });
        pending
    }

    fn position_of<R>(&self, handle: Handle<R>) -> ScopeResult<usize> {
        match self.handles.get(handle.index) {
            Some(held) if held.id() == handle.id => Ok(handle.index),
            _ => Err(ScopeError::InvalidState(format!(
                "handle {} does not belong to this stack",
                handle.id
            ))),
        }
    }

    fn locate<R>(&self, handle: Handle<R>) -> ScopeResult<&dyn ErasedHandle> {
        let index = self.position_of(handle)?;
        Ok(self.handles[index].as_ref())
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContextStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStack")
            .field("resources", &self.names())
            .field("config", &self.config)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for ContextStack {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        if !self.config.unwind_on_drop {
            error!(
                resources = ?self.names(),
                "context stack dropped with open resources; leaving them unreleased"
            );
            return;
        }

        let initial = std::thread::panicking().then_some(ScopeError::Panicked);
        debug!(
            resources = self.handles.len(),
            panicking = initial.is_some(),
            "context stack dropped without exit; unwinding"
        );
        self.closed = true;
        if let Some(failure) = self.unwind(initial) {
            error!(kind = failure.kind(), error = %failure, "unwind on drop ended with a failure");
        }
    }
}

fn mismatched(id: HandleId) -> ScopeError {
    ScopeError::InvalidState(format!("handle {id} points to a resource of another type"))
}

/// Resource created by [`ContextStack::defer`].
pub struct Deferred<C> {
    cleanup: Option<C>,
}

struct DeferFactory<C> {
    name: ResourceName,
    cleanup: C,
}

impl<C> ResourceFactory for DeferFactory<C>
where
    C: FnOnce(Option<&ScopeError>) -> ScopeResult<()> + 'static,
{
    type Resource = Deferred<C>;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<Self::Resource> {
        Ok(Deferred {
            cleanup: Some(self.cleanup),
        })
    }
}

impl<C> ScopedResource for Deferred<C>
where
    C: FnOnce(Option<&ScopeError>) -> ScopeResult<()> + 'static,
{
    fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()> {
        let cleanup = self
            .cleanup
            .take()
            .ok_or_else(|| ScopeError::InvalidState("deferred cleanup has already run".to_string()))?;
        cleanup(pending)
    }
}

/// Acquire one resource, run `body` with it, and release it.
///
/// Shorthand for a [`ContextStack::scope_default`] holding a single
/// resource; the return value follows the same rules.
pub fn with_resource<F, T, B>(factory: F, body: B) -> ScopeResult<Option<T>>
where
    F: ResourceFactory,
    B: FnOnce(&mut F::Resource) -> ScopeResult<T>,
{
    ContextStack::scope_default(|stack| {
        let handle = stack.enter(factory)?;
        body(stack.get_mut(handle)?)
    })
}

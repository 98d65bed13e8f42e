//! Release failures, suppression and drop-time unwinding.

#![cfg(feature = "testing")]

use std::error::Error as _;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use scopestack::monitoring::ResourceLeakDetector;
use scopestack::testing::prelude::*;
use scopestack::{
    ContextStack, ObserverSet, ReleasePolicy, ScopeConfig, ScopeError, PROCESSING_KIND,
};

#[test]
fn chained_release_failure_keeps_the_body_failure_as_source() {
    let log = ReleaseLog::new();
    let mut stack = ContextStack::with_observer(Arc::new(RecordingObserver::new()));
    stack.enter(ProbeFactory::new("journal", &log)).unwrap();
    stack
        .enter(ProbeFactory::new("connection", &log).failing_teardown())
        .unwrap();

    let body = ScopeError::processing("boom");
    let err = stack.exit(Some(body.clone())).unwrap_err();

    assert_eq!(err.kind(), "ReleaseError");
    assert!(err.to_string().contains("connection"));
    let source = err.source().expect("chained failure");
    assert_eq!(source.to_string(), "ProcessingError: boom");
    assert_eq!(err.root_cause(), &body);
}

#[test]
fn replace_policy_returns_only_the_release_failure() {
    let log = ReleaseLog::new();
    let config = ScopeConfig::default().with_release_policy(ReleasePolicy::Replace);
    let recorder = Arc::new(RecordingObserver::new());
    let mut stack = ContextStack::with_config(config, recorder.clone());
    stack
        .enter(ProbeFactory::new("connection", &log).failing_teardown())
        .unwrap();

    let err = stack
        .exit(Some(ScopeError::processing("boom")))
        .unwrap_err();

    assert_eq!(err.kind(), "ReleaseError");
    assert!(err.source().is_none());
    assert!(matches!(
        recorder.events().last(),
        Some(RecordedEvent::ScopeExited { failure: Some(_) })
    ));
}

#[test]
fn acquisition_failure_with_a_failing_unwind_keeps_both_failures() {
    let log = ReleaseLog::new();
    let mut stack = ContextStack::with_observer(Arc::new(RecordingObserver::new()));
    stack
        .enter(ProbeFactory::new("journal", &log).failing_teardown())
        .unwrap();

    let err = stack
        .enter(ProbeFactory::new("source", &log).failing_acquire())
        .unwrap_err();

    assert_eq!(err.kind(), "ReleaseError");
    assert_eq!(err.root_cause().kind(), "AcquisitionError");
    assert_eq!(log.released_names(), vec!["journal"]);
}

#[test]
fn middle_suppression_clears_the_failure_for_the_caller() {
    let log = ReleaseLog::new();
    let recorder = Arc::new(RecordingObserver::new());
    let mut stack = ContextStack::with_observer(recorder.clone());
    stack.enter(ProbeFactory::new("outer", &log)).unwrap();
    stack
        .enter(ProbeFactory::new("middle", &log).suppressing())
        .unwrap();
    stack.enter(ProbeFactory::new("inner", &log)).unwrap();

    let body = ScopeError::processing_with_kind("ValueError", "bad input");
    assert_eq!(stack.exit(Some(body.clone())), Ok(()));

    let suppressed: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|event| match event {
            RecordedEvent::FailureSuppressed { name, failure } => Some((name.to_string(), failure)),
            _ => None,
        })
        .collect();
    assert_eq!(suppressed, vec![("middle".to_string(), body)]);
    assert_eq!(log.pending_seen_by("outer"), vec![None]);
}

#[test]
fn early_return_unwinds_through_drop() {
    fn body(log: &ReleaseLog) -> Result<(), ScopeError> {
        let mut stack = ContextStack::new();
        stack.enter(ProbeFactory::new("first", log))?;
        stack.enter(ProbeFactory::new("second", log))?;
        if stack.len() == 2 {
            return Err(ScopeError::processing("early return"));
        }
        stack.exit(None)
    }

    let log = ReleaseLog::new();
    let err = body(&log).unwrap_err();

    assert_eq!(err.kind(), PROCESSING_KIND);
    assert_eq!(log.released_names(), vec!["second", "first"]);
}

#[test]
fn panic_unwinds_every_resource_and_leaves_nothing_open() {
    let log = ReleaseLog::new();
    let detector = Arc::new(ResourceLeakDetector::new());
    let observers = ObserverSet::new()
        .with(detector.clone())
        .with(Arc::new(RecordingObserver::new()));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut stack = ContextStack::with_observer(Arc::new(observers));
        stack.enter(ProbeFactory::new("journal", &log)).unwrap();
        stack.enter(ProbeFactory::new("connection", &log)).unwrap();
        panic!("body panicked");
    }));

    assert!(outcome.is_err());
    assert_eq!(log.released_names(), vec!["connection", "journal"]);
    assert_eq!(
        log.pending_seen_by("journal"),
        vec![Some(ScopeError::Panicked)]
    );
    assert!(detector.is_clean());
}

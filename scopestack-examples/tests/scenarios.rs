//! End-to-end checks of the demonstration scenarios.

use std::path::Path;
use std::sync::Arc;

use scopestack::testing::RecordingObserver;
use scopestack::ScopeError;
use scopestack_examples::connection::ConnectionEvent;
use scopestack_examples::journal::{parse_line, read_lines};
use scopestack_examples::scenarios::TRIGGER_FAILURE;
use scopestack_examples::{Demo, DemoConfig};
use tempfile::TempDir;

fn demo_in(dir: &TempDir) -> (Demo, Arc<RecordingObserver>) {
    let recorder = Arc::new(RecordingObserver::new());
    let demo = Demo::new(DemoConfig::new(dir.path())).with_observer(recorder.clone());
    (demo, recorder)
}

fn messages(path: &Path) -> Vec<String> {
    read_lines(path)
        .unwrap()
        .iter()
        .map(|line| {
            let (_, message) = parse_line(line).expect("every line has a timestamp prefix");
            message.to_string()
        })
        .collect()
}

fn files_in(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn nominal_scenario_writes_one_line_and_disconnects_once() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, recorder) = demo_in(&dir);

    demo.nominal().unwrap();

    let lines = read_lines(&demo.config().log_path()).unwrap();
    assert_eq!(lines.len(), 1);
    let (timestamp, message) = parse_line(&lines[0]).unwrap();
    assert_eq!(message, "Task completed on Server X");
    assert!(chrono::Local::now().naive_local() - timestamp < chrono::Duration::minutes(5));

    assert_eq!(demo.connections().count("disconnect"), 1);
    assert_eq!(demo.connections().count("failure"), 0);
    assert_eq!(recorder.release_order(), vec!["connection", "log"]);
    assert!(demo.leaks().is_clean());
}

#[test]
fn failing_scenario_reports_the_failure_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, recorder) = demo_in(&dir);

    let err = demo.failing("boom").unwrap_err();

    assert_eq!(err, ScopeError::processing("boom"));
    assert_eq!(
        demo.connections().snapshot(),
        vec![
            ConnectionEvent::Connected {
                service: "Database Y".to_string()
            },
            ConnectionEvent::Disconnected {
                service: "Database Y".to_string()
            },
            ConnectionEvent::FailureObserved {
                service: "Database Y".to_string(),
                kind: "ProcessingError".to_string(),
                message: "boom".to_string(),
            },
        ]
    );
    // the log was opened and closed, but nothing was written to it
    assert!(read_lines(&demo.config().log_path()).unwrap().is_empty());
    assert_eq!(recorder.release_order(), vec!["connection", "log"]);
    assert!(demo.leaks().is_clean());
}

#[test]
fn batch_stops_at_the_trigger_and_closes_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, recorder) = demo_in(&dir);
    demo.setup_operations().unwrap();

    let err = demo.batch().unwrap_err();

    assert_eq!(err, ScopeError::processing(TRIGGER_FAILURE));
    insta::assert_snapshot!(messages(&demo.config().journal_path()).join("\n"), @r###"
    SESSION START - operations.csv
    Processing: user_update with id=101
    Processing: data_sync with source=api
    Processing: error_trigger with simulate_crash
    SESSION ERROR - Exception: ProcessingError -> simulated crash during processing
    "###);
    assert_eq!(recorder.release_order(), vec!["journal", "source"]);
    assert!(demo.leaks().is_clean());
}

#[test]
fn batch_without_trigger_ends_with_a_success_marker() {
    let dir = tempfile::tempdir().unwrap();
    let demo = Demo::new(DemoConfig::new(dir.path()).with_trigger_operation("never_sent"));
    demo.setup_operations().unwrap();

    let summary = demo.batch().unwrap();

    let operations: Vec<&str> = summary
        .processed
        .iter()
        .map(|record| record.operation.as_str())
        .collect();
    assert_eq!(
        operations,
        vec!["user_update", "data_sync", "error_trigger", "email_send"]
    );
    let journal = messages(&demo.config().journal_path());
    assert_eq!(journal.len(), 6);
    assert_eq!(
        journal.last().map(String::as_str),
        Some("SESSION SUCCESS - normal end of processing")
    );
}

#[test]
fn missing_source_fails_before_the_journal_is_opened() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, recorder) = demo_in(&dir);

    let err = demo.batch().unwrap_err();

    assert_eq!(err.kind(), "AcquisitionError");
    assert!(err.to_string().contains("'source'"));
    assert!(!demo.config().journal_path().exists());
    assert!(recorder.release_order().is_empty());
}

#[test]
fn file_scenarios_leave_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, _recorder) = demo_in(&dir);

    demo.temp_file_class().unwrap();
    demo.temp_file_function().unwrap();
    demo.multiple_files().unwrap();

    assert!(files_in(&dir).is_empty());
    assert!(demo.leaks().is_clean());
}

#[test]
fn multiple_files_are_closed_in_reverse_order() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, recorder) = demo_in(&dir);

    demo.multiple_files().unwrap();

    assert_eq!(recorder.release_order(), vec!["c.txt", "b.txt", "a.txt"]);
}

#[test]
fn run_all_reports_failures_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let (demo, _recorder) = demo_in(&dir);

    let report = demo.run_all();

    let failed: Vec<&str> = report.failures().iter().map(|outcome| outcome.name).collect();
    assert_eq!(failed, vec!["failing", "batch"]);
    assert_eq!(report.outcome("verify_journal"), Some(&Ok(())));
    assert_eq!(report.outcomes().len(), 9);
    assert_eq!(
        files_in(&dir),
        vec!["journal.log", "log.txt", "operations.csv"]
    );
    assert!(demo.leaks().is_clean());
}

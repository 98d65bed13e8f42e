//! Demonstration scenarios
//!
//! Each scenario runs in its own scope. [`Demo::run_all`] is the only place
//! failures are caught: it reports them and moves on to the next scenario.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scopestack::monitoring::ResourceLeakDetector;
use scopestack::{
    ContextStack, LifecycleObserver, ObserverSet, ResourceName, ScopeConfig, ScopeError,
    ScopeResult, TracingObserver,
};
use tracing::{info, warn};

use crate::config::DemoConfig;
use crate::connection::{ConnectionEvents, ConnectionFactory};
use crate::errors::DemoError;
use crate::journal::{read_lines, JournalFactory};
use crate::session::SessionJournalFactory;
use crate::source::{source_identifier, write_operations, OperationRecord, OperationSourceFactory, SAMPLE_OPERATIONS};
use crate::tempfiles::{remove_if_present, scratch_file, FileWriterFactory};

/// Message of the failure raised by the failing scenario when run from
/// [`Demo::run_all`].
pub const CRITICAL_FAILURE: &str = "critical processing failure";

/// Message of the failure raised on the trigger record.
pub const TRIGGER_FAILURE: &str = "simulated crash during processing";

fn resource_name(value: &str) -> ScopeResult<ResourceName> {
    ResourceName::try_new(value).map_err(ScopeError::from)
}

/// Records processed by a batch that ran to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records written to the journal, in order
    pub processed: Vec<OperationRecord>,
}

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    /// Scenario name
    pub name: &'static str,
    /// What the scenario returned
    pub result: ScopeResult<()>,
}

/// Results of a [`Demo::run_all`] pass, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    outcomes: Vec<ScenarioOutcome>,
}

impl ScenarioReport {
    fn record(&mut self, name: &'static str, result: ScopeResult<()>) {
        match &result {
            Ok(()) => info!(scenario = name, "scenario completed"),
            Err(failure) => info!(
                scenario = name,
                kind = failure.kind(),
                "[Main] failure caught at top level: {failure}"
            ),
        }
        self.outcomes.push(ScenarioOutcome { name, result });
    }

    /// Every outcome.
    pub fn outcomes(&self) -> &[ScenarioOutcome] {
        &self.outcomes
    }

    /// Outcome of the scenario called `name`.
    pub fn outcome(&self, name: &str) -> Option<&ScopeResult<()>> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.name == name)
            .map(|outcome| &outcome.result)
    }

    /// Scenarios that ended with a failure.
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .collect()
    }
}

/// Runs the demonstration scenarios against a working directory.
pub struct Demo {
    config: DemoConfig,
    scope_config: ScopeConfig,
    connections: ConnectionEvents,
    leaks: Arc<ResourceLeakDetector>,
    observers: ObserverSet,
}

impl Demo {
    /// Scenarios logging through `tracing` and tracking leaks.
    pub fn new(config: DemoConfig) -> Self {
        let leaks = Arc::new(ResourceLeakDetector::new());
        let observers = ObserverSet::new()
            .with(Arc::new(TracingObserver::with_component("scopestack-demo")))
            .with(leaks.clone());
        Self {
            config,
            scope_config: ScopeConfig::default(),
            connections: ConnectionEvents::new(),
            leaks,
            observers,
        }
    }

    /// Also report lifecycle events to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers = self.observers.with(observer);
        self
    }

    /// Configuration in use.
    pub const fn config(&self) -> &DemoConfig {
        &self.config
    }

    /// Events recorded by every connection opened so far.
    pub const fn connections(&self) -> &ConnectionEvents {
        &self.connections
    }

    /// Handles acquired but not released, across every scenario.
    pub fn leaks(&self) -> &ResourceLeakDetector {
        &self.leaks
    }

    fn run<T, F>(&self, body: F) -> ScopeResult<Option<T>>
    where
        F: FnOnce(&mut ContextStack) -> ScopeResult<T>,
    {
        ContextStack::scope(
            self.scope_config.clone(),
            Arc::new(self.observers.clone()),
            body,
        )
    }

    /// Struct-based temp file: created, written, closed and deleted.
    pub fn temp_file_class(&self) -> ScopeResult<()> {
        info!("=== Temp file, struct-based resource ===");
        let path = self.config.path_for(&self.config.class_temp_file);
        self.run(|stack| {
            let writer = stack.enter(FileWriterFactory::temporary(resource_name("temp-class")?, path))?;
            stack
                .get_mut(writer)?
                .write_str("Temporary content written through a struct\n")?;
            info!("[Class] writing done");
            Ok(())
        })
        .map(|_| ())
    }

    /// Temp file built from a setup closure and a cleanup function.
    pub fn temp_file_function(&self) -> ScopeResult<()> {
        info!("=== Temp file, function-based resource ===");
        let path = self.config.path_for(&self.config.function_temp_file);
        self.run(|stack| {
            let scratch = stack.enter(scratch_file(resource_name("temp-function")?, path))?;
            let scratch = stack.get_mut(scratch)?;
            scratch
                .file
                .write_all(b"Another test through a cleanup function\n")
                .map_err(|source| DemoError::io(&scratch.path, source))?;
            info!("[Function] writing done");
            Ok(())
        })
        .map(|_| ())
    }

    /// Several files on one stack, closed together; deleted afterwards.
    pub fn multiple_files(&self) -> ScopeResult<()> {
        info!("=== Several files on one stack ===");
        let paths: Vec<PathBuf> = self
            .config
            .multi_files
            .iter()
            .map(|file| self.config.path_for(file))
            .collect();

        let written = self.run(|stack| {
            let mut writers = Vec::with_capacity(paths.len());
            for (file, path) in self.config.multi_files.iter().zip(&paths) {
                writers.push(stack.enter(FileWriterFactory::persistent(resource_name(file)?, path))?);
            }
            info!(files = ?self.config.multi_files, "[Multi] files opened");

            for writer in &writers {
                stack.get_mut(*writer)?.write_str("test\n")?;
            }
            info!("[Multi] wrote to every file");
            Ok(())
        });

        info!("[Multi] removing the files created");
        let cleanup = paths.iter().try_for_each(|path| remove_if_present(path));
        written?;
        cleanup.map_err(ScopeError::from)
    }

    /// Log file and connection, one line written, clean exit.
    pub fn nominal(&self) -> ScopeResult<()> {
        info!("=== Log file and connection, nominal case ===");
        self.run(|stack| {
            let log = stack.enter(JournalFactory::new(resource_name("log")?, self.config.log_path()))?;
            info!("[File] {} opened", self.config.log_file);
            let connection = stack.enter(ConnectionFactory::new(
                resource_name("connection")?,
                "Server X",
                &self.connections,
            ))?;

            let message = format!("Task completed on {}", stack.get(connection)?.service());
            stack.get_mut(log)?.write_line(&message)?;
            info!("[Task] log written: {message}");
            Ok(())
        })
        .map(|_| ())
    }

    /// Log file and connection; the body fails with `message`.
    pub fn failing(&self, message: &str) -> ScopeResult<()> {
        info!("=== Log file and connection, failing body ===");
        self.run::<(), _>(|stack| {
            info!("[Init] building the stack");
            stack.enter(JournalFactory::new(resource_name("log")?, self.config.log_path()))?;
            stack.enter(ConnectionFactory::new(
                resource_name("connection")?,
                "Database Y",
                &self.connections,
            ))?;

            info!("[Task] attempting critical processing");
            Err(ScopeError::processing(message))
        })
        .map(|_| ())
    }

    /// Generates the operation source used by [`batch`](Self::batch).
    pub fn setup_operations(&self) -> ScopeResult<PathBuf> {
        let path = self.config.source_path();
        write_operations(&path, &SAMPLE_OPERATIONS)?;
        info!("[Setup] '{}' generated", self.config.source_file);
        Ok(path)
    }

    /// Reads the operation source and journals each record until the
    /// trigger operation fails the batch.
    pub fn batch(&self) -> ScopeResult<BatchSummary> {
        info!("=== Batch processing ===");
        let source_path = self.config.source_path();
        let identifier = source_identifier(&source_path);

        self.run(|stack| {
            let source = stack.enter(OperationSourceFactory::new(resource_name("source")?, &source_path))?;
            let journal = stack.enter(SessionJournalFactory::new(
                resource_name("journal")?,
                self.config.journal_path(),
                identifier.as_str(),
            ))?;

            let mut summary = BatchSummary::default();
            while let Some(record) = stack.get_mut(source)?.next_record()? {
                info!(
                    " -> processing record {}: {} ({})",
                    record.index, record.operation, record.params
                );
                stack
                    .get_mut(journal)?
                    .write_line(&format!("Processing: {} with {}", record.operation, record.params))?;
                if record.operation == self.config.trigger_operation {
                    return Err(ScopeError::processing(TRIGGER_FAILURE));
                }
                summary.processed.push(record);
            }
            Ok(summary)
        })
        .map(Option::unwrap_or_default)
    }

    /// Reads a journal back and logs every line.
    pub fn verify_journal(&self, path: &Path) -> ScopeResult<Vec<String>> {
        info!("=== Contents of {} ===", path.display());
        let lines = read_lines(path)?;
        for line in &lines {
            info!("{line}");
        }
        Ok(lines)
    }

    /// Runs every scenario, reporting failures and carrying on.
    pub fn run_all(&self) -> ScenarioReport {
        let mut report = ScenarioReport::default();

        report.record("temp_file_class", self.temp_file_class());
        report.record("temp_file_function", self.temp_file_function());
        report.record("multiple_files", self.multiple_files());
        report.record("nominal", self.nominal());
        report.record("failing", self.failing(CRITICAL_FAILURE));
        report.record(
            "verify_log",
            self.verify_journal(&self.config.log_path()).map(|_| ()),
        );
        report.record("setup_operations", self.setup_operations().map(|_| ()));
        report.record("batch", self.batch().map(|_| ()));
        report.record(
            "verify_journal",
            self.verify_journal(&self.config.journal_path()).map(|_| ()),
        );

        let stats = self.leaks.stats();
        if stats.total_active > 0 {
            warn!(open = stats.total_active, by_name = ?stats.by_name, "resources left open");
        }
        report
    }
}

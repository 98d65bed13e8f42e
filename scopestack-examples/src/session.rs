//! Session journal: a journal that brackets its scope with markers
//!
//! ```text
//! [..] SESSION START - operations.csv
//! [..] Processing: user_update with id=101
//! [..] SESSION ERROR - Exception: ProcessingError -> simulated crash during processing
//! ```

use std::path::PathBuf;

use scopestack::{ResourceFactory, ResourceName, ScopeError, ScopeResult, ScopedResource};
use tracing::info;

use crate::errors::DemoError;
use crate::journal::AppendJournal;

/// Message of the success marker.
pub const SUCCESS_MESSAGE: &str = "normal end of processing";

/// Marker written when the session opens.
pub fn start_marker(source: &str) -> String {
    format!("SESSION START - {source}")
}

/// Marker written when the session closes, depending on the pending failure.
pub fn end_marker(pending: Option<&ScopeError>) -> String {
    match pending {
        Some(failure) => format!(
            "SESSION ERROR - Exception: {} -> {}",
            failure.kind(),
            failure.message()
        ),
        None => format!("SESSION SUCCESS - {SUCCESS_MESSAGE}"),
    }
}

/// A journal bracketed by session markers.
#[derive(Debug)]
pub struct SessionJournal {
    journal: AppendJournal,
    source: String,
}

impl SessionJournal {
    /// Appends a timestamped line between the markers.
    pub fn write_line(&mut self, message: &str) -> Result<(), DemoError> {
        self.journal.write_line(message)
    }

    /// Identifier of the source this session processes.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The underlying journal.
    pub const fn journal(&self) -> &AppendJournal {
        &self.journal
    }
}

impl ScopedResource for SessionJournal {
    fn teardown(&mut self, pending: Option<&ScopeError>) -> ScopeResult<()> {
        let marker = self.journal.write_line(&end_marker(pending));
        let closed = self.journal.close();
        info!(path = %self.journal.path().display(), "session journal closed");
        marker.and(closed).map_err(ScopeError::from)
    }
}

/// Opens a [`SessionJournal`] and writes the start marker.
#[derive(Debug, Clone)]
pub struct SessionJournalFactory {
    name: ResourceName,
    path: PathBuf,
    source: String,
}

impl SessionJournalFactory {
    /// Session journal at `path` for the source identified by `source`.
    pub fn new(name: ResourceName, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            name,
            path: path.into(),
            source: source.into(),
        }
    }
}

impl ResourceFactory for SessionJournalFactory {
    type Resource = SessionJournal;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<SessionJournal> {
        let mut journal = AppendJournal::open(self.path)?;
        journal.write_line(&start_marker(&self.source))?;
        Ok(SessionJournal {
            journal,
            source: self.source,
        })
    }
}

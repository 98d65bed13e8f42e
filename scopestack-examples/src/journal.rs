//! Timestamped append-only journal
//!
//! Every line is written as `[YYYY-MM-DD HH:MM:SS] <message>` in local time
//! and flushed immediately, so the file is complete whatever ends the scope.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use scopestack::{ResourceFactory, ResourceName, ScopeError, ScopeResult, ScopedResource};
use tracing::debug;

use crate::errors::DemoError;

/// `chrono` format of the timestamp prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats one journal line, newline included.
pub fn format_line<Tz>(timestamp: &DateTime<Tz>, message: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("[{}] {message}\n", timestamp.format(TIMESTAMP_FORMAT))
}

/// Splits a journal line into its timestamp and message.
///
/// Returns `None` when the line does not start with a well-formed prefix.
pub fn parse_line(line: &str) -> Option<(NaiveDateTime, &str)> {
    let rest = line.strip_prefix('[')?;
    let (stamp, message) = rest.split_once("] ")?;
    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((timestamp, message))
}

/// Reads every line of a journal file.
pub fn read_lines(path: &Path) -> Result<Vec<String>, DemoError> {
    let file = File::open(path).map_err(|source| DemoError::io(path, source))?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| DemoError::io(path, source))
}

/// An open journal file.
#[derive(Debug)]
pub struct AppendJournal {
    path: PathBuf,
    file: Option<File>,
    lines_written: usize,
}

impl AppendJournal {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DemoError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| DemoError::io(&path, source))?;
        debug!(path = %path.display(), "journal opened");
        Ok(Self {
            path,
            file: Some(file),
            lines_written: 0,
        })
    }

    /// Appends one timestamped line and flushes it.
    pub fn write_line(&mut self, message: &str) -> Result<(), DemoError> {
        let line = format_line(&Local::now(), message);
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| DemoError::Closed(format!("journal {}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| DemoError::io(&self.path, source))?;
        self.lines_written += 1;
        Ok(())
    }

    /// Flushes and closes the file. Closing twice is an error.
    pub fn close(&mut self) -> Result<(), DemoError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| DemoError::Closed(format!("journal {}", self.path.display())))?;
        file.flush().map_err(|source| DemoError::io(&self.path, source))?;
        debug!(path = %self.path.display(), lines = self.lines_written, "journal closed");
        Ok(())
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written through this handle.
    pub const fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Whether the file is still open.
    pub const fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl ScopedResource for AppendJournal {
    fn teardown(&mut self, _pending: Option<&ScopeError>) -> ScopeResult<()> {
        self.close().map_err(ScopeError::from)
    }
}

/// Opens an [`AppendJournal`] when entered.
#[derive(Debug, Clone)]
pub struct JournalFactory {
    name: ResourceName,
    path: PathBuf,
}

impl JournalFactory {
    /// Journal at `path`, tracked under `name`.
    pub fn new(name: ResourceName, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
        }
    }
}

impl ResourceFactory for JournalFactory {
    type Resource = AppendJournal;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<AppendJournal> {
        AppendJournal::open(self.path).map_err(ScopeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_line_format() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|date| date.and_hms_opt(7, 5, 1))
            .unwrap()
            .and_utc();
        assert_eq!(
            format_line(&timestamp, "Task completed"),
            "[2024-03-09 07:05:01] Task completed\n"
        );
    }

    #[test]
    fn test_parse_line() {
        let line = format_line(&Utc::now(), "SESSION START - operations.csv");
        let (_, message) = parse_line(line.trim_end()).unwrap();
        assert_eq!(message, "SESSION START - operations.csv");

        assert!(parse_line("no prefix").is_none());
        assert!(parse_line("[2024-13-40 99:00:00] bad date").is_none());
    }

    #[test]
    fn test_closed_journal_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = AppendJournal::open(dir.path().join("journal.log")).unwrap();
        journal.write_line("first").unwrap();
        journal.close().unwrap();

        assert!(matches!(journal.write_line("late"), Err(DemoError::Closed(_))));
        assert!(matches!(journal.close(), Err(DemoError::Closed(_))));
        assert_eq!(journal.lines_written(), 1);
    }

    #[test]
    fn test_appends_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        for message in ["one", "two"] {
            let mut journal = AppendJournal::open(&path).unwrap();
            journal.write_line(message).unwrap();
            journal.close().unwrap();
        }

        let messages: Vec<String> = read_lines(&path)
            .unwrap()
            .iter()
            .filter_map(|line| parse_line(line).map(|(_, message)| message.to_string()))
            .collect();
        assert_eq!(messages, vec!["one", "two"]);
    }
}

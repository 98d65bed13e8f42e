//! Demo configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::DemoError;

/// Environment variable naming the directory the demo works in.
pub const WORKDIR_ENV: &str = "SCOPESTACK_WORKDIR";

/// Where the demo writes its files and what it calls them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Directory every file below is created in
    pub workdir: PathBuf,
    /// Append-only log used by the connection scenarios
    pub log_file: String,
    /// Session journal written by the batch scenario
    pub journal_file: String,
    /// Operation source read by the batch scenario
    pub source_file: String,
    /// Operation that makes the batch fail
    pub trigger_operation: String,
    /// Temp file of the class-style scenario
    pub class_temp_file: String,
    /// Temp file of the function-style scenario
    pub function_temp_file: String,
    /// Files opened together on one stack
    pub multi_files: Vec<String>,
}

impl DemoConfig {
    /// Default file names inside `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            log_file: "log.txt".to_string(),
            journal_file: "journal.log".to_string(),
            source_file: "operations.csv".to_string(),
            trigger_operation: "error_trigger".to_string(),
            class_temp_file: "temp_part1.txt".to_string(),
            function_temp_file: "temp_part2.txt".to_string(),
            multi_files: vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()],
        }
    }

    /// Working directory from [`WORKDIR_ENV`], or the current directory.
    pub fn from_env() -> Result<Self, DemoError> {
        let workdir = match std::env::var_os(WORKDIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().map_err(|source| DemoError::Io {
                path: PathBuf::from("."),
                source,
            })?,
        };
        Ok(Self::new(workdir))
    }

    /// Use another trigger operation.
    #[must_use]
    pub fn with_trigger_operation(mut self, operation: impl Into<String>) -> Self {
        self.trigger_operation = operation.into();
        self
    }

    /// Path of a file inside the working directory.
    pub fn path_for(&self, file: &str) -> PathBuf {
        self.workdir.join(file)
    }

    /// Path of the append-only log.
    pub fn log_path(&self) -> PathBuf {
        self.path_for(&self.log_file)
    }

    /// Path of the session journal.
    pub fn journal_path(&self) -> PathBuf {
        self.path_for(&self.journal_file)
    }

    /// Path of the operation source.
    pub fn source_path(&self) -> PathBuf {
        self.path_for(&self.source_file)
    }

    /// Working directory.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

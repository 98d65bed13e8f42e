//! Errors raised by the demo resources

use std::path::PathBuf;

use scopestack::{ScopeError, PROCESSING_KIND};
use thiserror::Error;

/// Failures of the file-backed demo resources.
#[derive(Debug, Error)]
pub enum DemoError {
    /// A file operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A source line could not be split into operation and parameters.
    #[error("line {line}: expected 'operation,params', found '{content}'")]
    MalformedRecord {
        /// 1-based line number in the source file
        line: usize,
        /// The offending line
        content: String,
    },

    /// The source file does not start with the expected header.
    #[error("{}: missing 'operation,params' header", path.display())]
    MissingHeader {
        /// Source file
        path: PathBuf,
    },

    /// The resource was used after it was closed.
    #[error("{0} is already closed")]
    Closed(String),
}

impl DemoError {
    /// Wraps an I/O error with the file it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Failure kind reported to release steps.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IoError",
            Self::MalformedRecord { .. } | Self::MissingHeader { .. } => PROCESSING_KIND,
            Self::Closed(_) => "InvalidState",
        }
    }
}

impl From<DemoError> for ScopeError {
    fn from(error: DemoError) -> Self {
        Self::processing_with_kind(error.kind(), error.to_string())
    }
}

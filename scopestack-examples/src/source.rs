//! Operation source: a two-column `operation,params` file

use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};

use scopestack::{ResourceFactory, ResourceName, ScopeError, ScopeResult, ScopedResource};
use tracing::debug;

use crate::errors::DemoError;

/// First line of every operation source.
pub const HEADER: &str = "operation,params";

/// Records the batch scenario processes; the third one is the trigger.
pub const SAMPLE_OPERATIONS: [(&str, &str); 4] = [
    ("user_update", "id=101"),
    ("data_sync", "source=api"),
    ("error_trigger", "simulate_crash"),
    ("email_send", "admin@local"),
];

/// One record of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    /// 1-based position among the records
    pub index: usize,
    /// 1-based line number in the file
    pub line: usize,
    /// Operation name
    pub operation: String,
    /// Everything after the first separator
    pub params: String,
}

/// Splits a record line on its first comma.
pub fn parse_record(index: usize, line: usize, content: &str) -> Result<OperationRecord, DemoError> {
    let (operation, params) = content
        .split_once(',')
        .ok_or_else(|| DemoError::MalformedRecord {
            line,
            content: content.to_string(),
        })?;
    Ok(OperationRecord {
        index,
        line,
        operation: operation.trim().to_string(),
        params: params.trim().to_string(),
    })
}

/// Writes a source file with the header and the given records.
pub fn write_operations(path: &Path, records: &[(&str, &str)]) -> Result<(), DemoError> {
    let mut file = File::create(path).map_err(|source| DemoError::io(path, source))?;
    let mut contents = format!("{HEADER}\n");
    for (operation, params) in records {
        contents.push_str(operation);
        contents.push(',');
        contents.push_str(params);
        contents.push('\n');
    }
    file.write_all(contents.as_bytes())
        .map_err(|source| DemoError::io(path, source))
}

/// An open operation source, positioned after its header.
#[derive(Debug)]
pub struct OperationSource {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line: usize,
    records: usize,
}

impl OperationSource {
    /// Opens `path` and checks its header.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DemoError> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| DemoError::io(&path, source))?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .transpose()
            .map_err(|source| DemoError::io(&path, source))?;
        if header.as_deref().map(str::trim) != Some(HEADER) {
            return Err(DemoError::MissingHeader { path });
        }

        debug!(path = %path.display(), "operation source opened");
        Ok(Self {
            path,
            lines: Some(lines),
            line: 1,
            records: 0,
        })
    }

    /// Next record, skipping blank lines. `None` at the end of the file.
    pub fn next_record(&mut self) -> Result<Option<OperationRecord>, DemoError> {
        let lines = self
            .lines
            .as_mut()
            .ok_or_else(|| DemoError::Closed(format!("source {}", self.path.display())))?;

        for content in lines.by_ref() {
            self.line += 1;
            let content = content.map_err(|source| DemoError::io(&self.path, source))?;
            if content.trim().is_empty() {
                continue;
            }
            self.records += 1;
            return parse_record(self.records, self.line, &content).map(Some);
        }
        Ok(None)
    }

    /// Closes the file. Closing twice is an error.
    pub fn close(&mut self) -> Result<(), DemoError> {
        if self.lines.take().is_none() {
            return Err(DemoError::Closed(format!("source {}", self.path.display())));
        }
        debug!(path = %self.path.display(), records = self.records, "operation source closed");
        Ok(())
    }

    /// File name, used to identify the source in session markers.
    pub fn identifier(&self) -> String {
        source_identifier(&self.path)
    }

    /// Records read so far.
    pub const fn records_read(&self) -> usize {
        self.records
    }
}

/// File name of `path`, or the whole path when it has none.
pub fn source_identifier(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

impl ScopedResource for OperationSource {
    fn teardown(&mut self, _pending: Option<&ScopeError>) -> ScopeResult<()> {
        self.close().map_err(ScopeError::from)
    }
}

/// Opens an [`OperationSource`] when entered.
#[derive(Debug, Clone)]
pub struct OperationSourceFactory {
    name: ResourceName,
    path: PathBuf,
}

impl OperationSourceFactory {
    /// Source at `path`, tracked under `name`.
    pub fn new(name: ResourceName, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
        }
    }
}

impl ResourceFactory for OperationSourceFactory {
    type Resource = OperationSource;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<OperationSource> {
        OperationSource::open(self.path).map_err(ScopeError::from)
    }
}

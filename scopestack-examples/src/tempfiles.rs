//! File writers released by a scope
//!
//! [`FileWriterFactory`] is the struct-based way to write a scoped file;
//! [`scratch_file`] builds the same behaviour from a setup closure and a
//! cleanup function.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use scopestack::{
    from_fn, FnFactory, ResourceFactory, ResourceName, ScopeError, ScopeResult, ScopedResource,
};
use tracing::info;

use crate::errors::DemoError;

/// A file opened for writing.
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    file: Option<File>,
    remove_on_close: bool,
}

impl FileWriter {
    /// Writes `text` as is.
    pub fn write_str(&mut self, text: &str) -> Result<(), DemoError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| DemoError::Closed(format!("file {}", self.path.display())))?;
        file.write_all(text.as_bytes())
            .map_err(|source| DemoError::io(&self.path, source))
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScopedResource for FileWriter {
    fn teardown(&mut self, _pending: Option<&ScopeError>) -> ScopeResult<()> {
        let flushed = match self.file.take() {
            Some(mut file) => file
                .flush()
                .map_err(|source| DemoError::io(&self.path, source)),
            None => Err(DemoError::Closed(format!("file {}", self.path.display()))),
        };

        let removed = if self.remove_on_close {
            remove_if_present(&self.path)
        } else {
            Ok(())
        };
        flushed.and(removed).map_err(ScopeError::from)
    }
}

/// Creates a [`FileWriter`] when entered.
#[derive(Debug, Clone)]
pub struct FileWriterFactory {
    name: ResourceName,
    path: PathBuf,
    remove_on_close: bool,
}

impl FileWriterFactory {
    /// A file that stays on disk after the scope.
    pub fn persistent(name: ResourceName, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
            remove_on_close: false,
        }
    }

    /// A file deleted when the scope releases it.
    pub fn temporary(name: ResourceName, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
            remove_on_close: true,
        }
    }
}

impl ResourceFactory for FileWriterFactory {
    type Resource = FileWriter;

    fn name(&self) -> ResourceName {
        self.name.clone()
    }

    fn acquire(self) -> ScopeResult<FileWriter> {
        info!(path = %self.path.display(), "creating file");
        let file = File::create(&self.path).map_err(|source| DemoError::io(&self.path, source))?;
        Ok(FileWriter {
            path: self.path,
            file: Some(file),
            remove_on_close: self.remove_on_close,
        })
    }
}

/// Value produced by [`scratch_file`].
#[derive(Debug)]
pub struct ScratchFile {
    /// Where the file lives
    pub path: PathBuf,
    /// The open file
    pub file: File,
}

/// Temporary file built from a setup closure and a cleanup function.
pub fn scratch_file(
    name: ResourceName,
    path: PathBuf,
) -> FnFactory<
    ScratchFile,
    impl FnOnce() -> ScopeResult<ScratchFile>,
    fn(&mut ScratchFile, Option<&ScopeError>) -> ScopeResult<()>,
> {
    from_fn(
        name,
        move || {
            info!(path = %path.display(), "creating file");
            let file = File::create(&path).map_err(|source| DemoError::io(&path, source))?;
            Ok(ScratchFile { path, file })
        },
        discard_scratch as fn(&mut ScratchFile, Option<&ScopeError>) -> ScopeResult<()>,
    )
}

fn discard_scratch(scratch: &mut ScratchFile, _pending: Option<&ScopeError>) -> ScopeResult<()> {
    let flushed = scratch
        .file
        .flush()
        .map_err(|source| DemoError::io(&scratch.path, source));
    let removed = remove_if_present(&scratch.path);
    flushed.and(removed).map_err(ScopeError::from)
}

/// Deletes `path` if it exists.
pub fn remove_if_present(path: &Path) -> Result<(), DemoError> {
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_file(path).map_err(|source| DemoError::io(path, source))?;
    info!(path = %path.display(), "deleted file");
    Ok(())
}

//! I/O error types for the file layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for file operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur during file operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying OS error.
        #[from]
        source: io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// File already exists.
    #[error("file already exists: {path}")]
    AlreadyExists {
        /// Path that was being created.
        path: PathBuf,
    },

    /// Short read or write: fewer bytes transferred than expected.
    #[error("short {operation}: expected {expected} bytes, got {actual}")]
    ShortIo {
        /// "read" or "write".
        operation: &'static str,
        /// Bytes expected.
        expected: usize,
        /// Bytes transferred.
        actual: usize,
    },

    /// Operation not allowed for the mode the file was opened in.
    #[error("invalid operation: {operation} not allowed on a {mode} file")]
    InvalidOperation {
        /// The rejected operation.
        operation: &'static str,
        /// The file's open mode.
        mode: &'static str,
    },

    /// A blocking-pool task was cancelled or panicked.
    #[error("background I/O task failed: {message}")]
    TaskFailed {
        /// Join error description.
        message: String,
    },
}

impl IoError {
    /// Creates a `ShortIo` error for reads.
    pub fn short_read(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "read",
            expected,
            actual,
        }
    }

    /// Creates a `ShortIo` error for writes.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortIo {
            operation: "write",
            expected,
            actual,
        }
    }

    /// Converts a std I/O error, attaching path context where it helps.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { source: err },
        }
    }

    /// Wraps a tokio join error.
    pub(crate) fn task_failed(err: impl std::fmt::Display) -> Self {
        Self::TaskFailed {
            message: err.to_string(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_io() {
        let err = IoError::short_read(100, 50);
        assert!(matches!(
            err,
            IoError::ShortIo {
                operation: "read",
                expected: 100,
                actual: 50,
            }
        ));
    }

    #[test]
    fn test_from_io_with_path() {
        let not_found = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = IoError::from_io_with_path(not_found, "/tmp/resource.verso");
        assert!(err.is_not_found());

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = IoError::from_io_with_path(other, "/tmp/resource.verso");
        assert!(matches!(err, IoError::Io { .. }));
    }
}

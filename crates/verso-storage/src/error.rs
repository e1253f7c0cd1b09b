//! Storage error types.

use thiserror::Error;

use crate::codec::CodecError;
use crate::file::IoError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the page reader and writer.
///
/// No failure is retried internally. An `Io` or `FatalState` error leaves
/// the writer unusable; partial-commit safety comes entirely from the dual
/// uber page and the last data sync, never from error recovery.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying file operation failed.
    #[error("storage I/O failure: {source}")]
    Io {
        /// The failed file-layer operation.
        #[from]
        source: IoError,
    },

    /// The byte-transform chain failed to encode or decode a payload.
    #[error("codec failure: {source}")]
    Codec {
        /// The failed transform.
        #[from]
        source: CodecError,
    },

    /// The writer reached a state it cannot continue from, e.g. a cache
    /// lookup timeout while rolling back to a revision.
    #[error("writer in fatal state: {reason}")]
    FatalState {
        /// What went wrong.
        reason: String,
    },

    /// On-disk state contradicts the binary contract.
    #[error("corrupt resource: {detail}")]
    Corrupt {
        /// What was found.
        detail: String,
    },
}

impl StorageError {
    /// Creates a `FatalState` error.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::FatalState {
            reason: reason.into(),
        }
    }

    /// Creates a `Corrupt` error.
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt {
            detail: detail.into(),
        }
    }

    /// Returns true if the writer must not be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FatalState { .. })
    }
}

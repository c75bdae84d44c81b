//! Error types for sitepush-sync.
//!
//! [`SyncError`] aborts a run. [`FileError`] is recorded against a single
//! file and never stops the remaining files from being attempted.

use std::path::{Path, PathBuf};

use thiserror::Error;

use sitepush_core::ObjectKey;

use crate::store::StoreError;

/// Errors that abort a run before or instead of processing files.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local build tree does not exist or is not a directory.
    #[error("build directory not found at {path}")]
    BuildDirMissing { path: PathBuf },

    /// Listing the remote objects failed; remote state is unknown.
    #[error("remote inventory unavailable for s3://{bucket}/{prefix}: {message}")]
    InventoryUnavailable {
        bucket: String,
        prefix: String,
        message: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (run report).
    #[error("report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A failure confined to one local file.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    #[error("{path} maps to key {key}, already taken by {first}")]
    DuplicateKey {
        path: PathBuf,
        key: ObjectKey,
        first: PathBuf,
    },

    #[error("upload of {key} failed after {attempts} attempt(s): {source}")]
    Upload {
        key: ObjectKey,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

impl FileError {
    /// Local path the failure concerns, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FileError::Read { path, .. }
            | FileError::Walk { path, .. }
            | FileError::NonUtf8Path { path }
            | FileError::DuplicateKey { path, .. } => Some(path),
            FileError::Upload { .. } => None,
        }
    }

    /// Remote key the failure concerns, when one was derived.
    pub fn key(&self) -> Option<&ObjectKey> {
        match self {
            FileError::DuplicateKey { key, .. } | FileError::Upload { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

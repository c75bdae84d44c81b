//! Run report: what happened to every file in one run.
//!
//! Optionally persisted as pretty JSON. Writes use the atomic `.tmp` + rename
//! pattern so a half-written report never replaces a complete one.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitepush_core::ObjectKey;

use crate::error::{io_err, SyncError};

/// Outcome for a single local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Sent to the bucket (new key or changed content).
    Uploaded {
        key: ObjectKey,
        bytes: u64,
        content_type: Option<String>,
    },
    /// Skipped; the remote entity tag already contains the content hash.
    Unchanged { key: ObjectKey },
    /// `--dry-run` mode: the file *would* have been uploaded.
    WouldUpload {
        key: ObjectKey,
        bytes: u64,
        content_type: Option<String>,
    },
    /// Could not be read, walked or uploaded.
    Failed {
        key: Option<ObjectKey>,
        path: PathBuf,
        error: String,
    },
}

impl FileOutcome {
    /// Key used to order outcomes; failures without a key sort by path.
    fn sort_key(&self) -> String {
        match self {
            FileOutcome::Uploaded { key, .. }
            | FileOutcome::Unchanged { key }
            | FileOutcome::WouldUpload { key, .. } => key.0.clone(),
            FileOutcome::Failed { key: Some(key), .. } => key.0.clone(),
            FileOutcome::Failed { key: None, path, .. } => path.to_string_lossy().into_owned(),
        }
    }
}

/// Summary of one run against one bucket/prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub bucket: String,
    pub prefix: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// `true` when the listing failed and the run continued without it.
    pub inventory_degraded: bool,
    pub inventory_size: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl SyncReport {
    /// Sort outcomes by key so reports are stable across runs.
    pub(crate) fn sort_outcomes(&mut self) {
        self.outcomes.sort_by_cached_key(FileOutcome::sort_key);
    }

    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Uploaded { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Unchanged { .. }))
    }

    pub fn would_upload(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::WouldUpload { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    /// True when every file was uploaded, skipped or (dry run) planned.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                FileOutcome::Uploaded { bytes, .. } => *bytes,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|&o| pred(o)).count()
    }
}

/// Save `report` to `path` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, report: &SyncReport) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(report)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

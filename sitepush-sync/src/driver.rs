//! Sync driver: hash, decide and upload every local file.
//!
//! ## Per-file protocol
//!
//! 1. Read the file fully into memory.
//! 2. MD5 hash the content.
//! 3. Look the key up in the remote inventory and skip if the entity tag
//!    contains the hash.
//! 4. Infer the content type from the file name.
//! 5. Put with explicit length, content type (if known) and public-read ACL.
//!
//! Files are independent of each other, so steps 1 to 5 run on a bounded pool.
//! A failing file is recorded and never stops the others.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use sitepush_core::ContentHash;

use crate::error::FileError;
use crate::inventory::{Inventory, UploadDecision};
use crate::report::FileOutcome;
use crate::store::{AccessPolicy, ObjectStore, PutObject};
use crate::walk::{LocalFile, LocalScan};

/// Upper bound for a single retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Decide but never put.
    pub dry_run: bool,
    /// Continue with an empty inventory when listing fails.
    pub fail_open: bool,
    /// Maximum files hashed/uploaded at once.
    pub concurrency: usize,
    /// Extra attempts per failed put. `0` attempts every file exactly once.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
    pub access: AccessPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            fail_open: false,
            concurrency: 8,
            max_retries: 0,
            retry_backoff: Duration::from_millis(200),
            access: AccessPolicy::PublicRead,
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Reconciles local files against a fixed inventory snapshot.
pub struct SyncDriver<'a> {
    store: &'a dyn ObjectStore,
    inventory: &'a Inventory,
    options: &'a RunOptions,
}

impl<'a> SyncDriver<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        inventory: &'a Inventory,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            store,
            inventory,
            options,
        }
    }

    /// Process a scanned tree. Scan failures are carried into the outcomes.
    pub async fn sync_scan(&self, scan: LocalScan) -> Vec<FileOutcome> {
        let mut outcomes: Vec<FileOutcome> =
            scan.failures.iter().map(failed_outcome).collect();
        outcomes.extend(self.sync_files(scan.files).await);
        outcomes
    }

    /// Process `files` with at most `concurrency` in flight.
    ///
    /// Outcomes arrive in completion order.
    pub async fn sync_files(&self, files: Vec<LocalFile>) -> Vec<FileOutcome> {
        stream::iter(files)
            .map(|file| self.sync_file(file))
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await
    }

    /// Hash, decide and (unless skipped) upload a single file.
    pub async fn sync_file(&self, file: LocalFile) -> FileOutcome {
        let body = match tokio::fs::read(&file.path).await {
            Ok(body) => body,
            Err(source) => {
                let err = FileError::Read {
                    path: file.path.clone(),
                    source,
                };
                tracing::error!(key = %file.key, error = %err, "read failed");
                return FileOutcome::Failed {
                    key: Some(file.key),
                    path: file.path,
                    error: err.to_string(),
                };
            }
        };

        let hash = ContentHash::of(&body);
        if self.inventory.decide(&file.key, &hash) == UploadDecision::Skip {
            tracing::debug!(key = %file.key, "unchanged");
            return FileOutcome::Unchanged { key: file.key };
        }

        let content_type = content_type_for(&file.relative);
        let bytes = body.len() as u64;

        if self.options.dry_run {
            tracing::info!(key = %file.key, bytes, "[dry-run] would upload");
            return FileOutcome::WouldUpload {
                key: file.key,
                bytes,
                content_type,
            };
        }

        let request = PutObject {
            key: file.key,
            body,
            content_type,
            access: self.options.access,
        };
        match self.put_with_retry(&request).await {
            Ok(attempts) => {
                tracing::info!(
                    key = %request.key,
                    bytes,
                    content_type = request.content_type.as_deref().unwrap_or("-"),
                    attempts,
                    "uploaded"
                );
                FileOutcome::Uploaded {
                    key: request.key,
                    bytes,
                    content_type: request.content_type,
                }
            }
            Err(err) => {
                tracing::error!(key = %request.key, error = %err, "upload failed");
                FileOutcome::Failed {
                    key: Some(request.key),
                    path: file.path,
                    error: err.to_string(),
                }
            }
        }
    }

    /// Put `request`, retrying up to `max_retries` times. Returns the number
    /// of attempts made.
    async fn put_with_retry(&self, request: &PutObject) -> Result<u32, FileError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.store.put_object(request).await {
                Ok(()) => return Ok(attempt),
                Err(source) if attempt > self.options.max_retries => {
                    return Err(FileError::Upload {
                        key: request.key.clone(),
                        attempts: attempt,
                        source,
                    })
                }
                Err(source) => {
                    let delay = backoff_delay(self.options.retry_backoff, attempt);
                    tracing::warn!(
                        key = %request.key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %source,
                        "upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Media type for `name` from the standard extension table, if known.
pub fn content_type_for(name: &str) -> Option<String> {
    mime_guess::from_path(name).first_raw().map(str::to_owned)
}

/// `base * 2^(attempt - 1)`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

fn failed_outcome(err: &FileError) -> FileOutcome {
    FileOutcome::Failed {
        key: err.key().cloned(),
        path: err.path().map(|p| p.to_path_buf()).unwrap_or_default(),
        error: err.to_string(),
    }
}

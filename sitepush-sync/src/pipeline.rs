//! Shared push pipeline entrypoint used by the CLI.
//!
//! One linear pass per invocation: list the remote inventory, walk the build
//! tree, then hash/decide/upload every file.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use sitepush_core::{KeyPrefix, PushConfig};

use crate::driver::{RunOptions, SyncDriver};
use crate::error::SyncError;
use crate::inventory::{list_inventory, Inventory};
use crate::report::SyncReport;
use crate::s3::S3Store;
use crate::store::ObjectStore;
use crate::walk;

/// Sync the tree at `root` into `store` under `prefix`.
///
/// Returns `Err` only when the run cannot start: missing build directory, or
/// an unavailable inventory without `fail_open`. Per-file failures are
/// reported in [`SyncReport::outcomes`] after every file has been attempted.
pub async fn run(
    store: &dyn ObjectStore,
    root: &Path,
    prefix: &KeyPrefix,
    options: &RunOptions,
) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();

    if !root.is_dir() {
        return Err(SyncError::BuildDirMissing {
            path: root.to_path_buf(),
        });
    }

    let (inventory, inventory_degraded) = match list_inventory(store, prefix).await {
        Ok(inventory) => (inventory, false),
        Err(err @ SyncError::InventoryUnavailable { .. }) if options.fail_open => {
            tracing::warn!(
                error = %err,
                "continuing with an empty inventory; every file will be uploaded"
            );
            (Inventory::empty(), true)
        }
        Err(err) => return Err(err),
    };

    let scan = walk::scan(root, prefix);
    tracing::debug!(
        root = %root.display(),
        files = scan.files.len(),
        failures = scan.failures.len(),
        "scanned build tree"
    );

    let driver = SyncDriver::new(store, &inventory, options);
    let outcomes = driver.sync_scan(scan).await;

    let mut report = SyncReport {
        bucket: store.bucket().to_owned(),
        prefix: prefix.as_str().to_owned(),
        started_at,
        finished_at: Utc::now(),
        dry_run: options.dry_run,
        inventory_degraded,
        inventory_size: inventory.len(),
        outcomes,
    };
    report.sort_outcomes();

    tracing::info!(
        bucket = %report.bucket,
        uploaded = report.uploaded(),
        unchanged = report.unchanged(),
        would_upload = report.would_upload(),
        failed = report.failed(),
        "push finished"
    );
    Ok(report)
}

/// Connect to the bucket named in `config` and run [`run`] against its
/// build directory.
pub async fn push(
    config: &PushConfig,
    options: &RunOptions,
    timeout: Duration,
) -> Result<SyncReport, SyncError> {
    if !config.build_dir.is_dir() {
        return Err(SyncError::BuildDirMissing {
            path: config.build_dir.clone(),
        });
    }
    let store = S3Store::connect(config, timeout).await;
    run(&store, &config.build_dir, &config.prefix, options).await
}

/// Connect to the bucket named in `config` and list its inventory.
pub async fn inventory(config: &PushConfig, timeout: Duration) -> Result<Inventory, SyncError> {
    let store = S3Store::connect(config, timeout).await;
    list_inventory(&store, &config.prefix).await
}

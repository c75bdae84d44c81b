//! End-to-end push behavior against an in-memory bucket.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use sitepush_core::KeyPrefix;
use sitepush_sync::{
    list_inventory, memory::MemoryStore, pipeline, store::ListPage, store::RemoteObject,
    AccessPolicy, FileOutcome, ObjectStore, PutObject, RunOptions, StoreError, SyncError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

/// A small site like the generator produces.
fn build_tree() -> TempDir {
    let build = TempDir::new().expect("build dir");
    write(build.path(), "index.html", "<html><body>hi</body></html>");
    write(build.path(), "feed.atom", "<feed/>");
    write(build.path(), "css/cache_main.3f2a.css", "body{margin:0}");
    write(build.path(), "img/logo.svg", "<svg/>");
    build
}

async fn push(store: &MemoryStore, root: &Path, prefix: &str) -> sitepush_sync::SyncReport {
    pipeline::run(store, root, &KeyPrefix::new(prefix), &RunOptions::default())
        .await
        .expect("run")
}

fn uploaded_keys(report: &sitepush_sync::SyncReport) -> Vec<String> {
    report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            FileOutcome::Uploaded { key, .. } => Some(key.0.clone()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Idempotence and change detection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_run_on_unchanged_tree_uploads_nothing() {
    let build = build_tree();
    let store = MemoryStore::new("play.example.org");

    let first = push(&store, build.path(), "").await;
    assert_eq!(first.uploaded(), 4);

    store.clear_put_log();
    let second = push(&store, build.path(), "").await;
    assert_eq!(second.uploaded(), 0);
    assert_eq!(second.unchanged(), 4);
    assert!(store.put_log().is_empty(), "idempotent re-run must not write");
}

#[tokio::test]
async fn changed_byte_reuploads_only_that_key() {
    let build = build_tree();
    let store = MemoryStore::new("site");
    push(&store, build.path(), "assets").await;

    write(build.path(), "css/cache_main.3f2a.css", "body{margin:1}");
    store.clear_put_log();
    let report = push(&store, build.path(), "assets").await;

    assert_eq!(uploaded_keys(&report), vec!["assets/css/cache_main.3f2a.css"]);
    assert_eq!(store.put_log().len(), 1);
    assert_eq!(
        store.get("assets/css/cache_main.3f2a.css").expect("object").body,
        b"body{margin:1}"
    );
}

#[tokio::test]
async fn rename_uploads_under_new_key_and_leaves_old_key() {
    let build = build_tree();
    let store = MemoryStore::new("site");
    push(&store, build.path(), "").await;

    fs::rename(
        build.path().join("css/cache_main.3f2a.css"),
        build.path().join("css/cache_main.9c1d.css"),
    )
    .expect("rename");
    let report = push(&store, build.path(), "").await;

    assert_eq!(uploaded_keys(&report), vec!["css/cache_main.9c1d.css"]);
    let keys = store.keys();
    assert!(keys.contains(&"css/cache_main.3f2a.css".to_string()), "stale keys are never deleted");
    assert!(keys.contains(&"css/cache_main.9c1d.css".to_string()));
}

// ---------------------------------------------------------------------------
// 2. Fingerprints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quoted_etag_of_empty_file_is_a_match() {
    let build = TempDir::new().expect("build");
    write(build.path(), "empty.txt", "");
    let store = MemoryStore::new("site");
    store.insert_with_etag("empty.txt", b"", "\"d41d8cd98f00b204e9800998ecf8427e\"");

    let report = push(&store, build.path(), "").await;
    assert_eq!(report.unchanged(), 1);
    assert!(store.put_log().is_empty());
}

#[tokio::test]
async fn multipart_etag_forces_reupload() {
    let build = TempDir::new().expect("build");
    write(build.path(), "big.js", "console.log(1)");
    let store = MemoryStore::new("site");
    store.insert_with_etag("big.js", b"console.log(1)", "\"9b2cf535f27731c974343645a3985328-3\"");

    let report = push(&store, build.path(), "").await;
    assert_eq!(uploaded_keys(&report), vec!["big.js"]);
}

#[tokio::test]
async fn objects_outside_prefix_are_never_used_for_skips() {
    let build = TempDir::new().expect("build");
    write(build.path(), "index.html", "<html>");
    let store = MemoryStore::new("site");
    store.insert("index.html", b"<html>");

    let report = push(&store, build.path(), "blog").await;
    assert_eq!(uploaded_keys(&report), vec!["blog/index.html"]);
}

// ---------------------------------------------------------------------------
// 3. Upload metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn uploads_are_public_with_inferred_content_types() {
    let build = TempDir::new().expect("build");
    write(build.path(), "style.css", "a{}");
    write(build.path(), "notes.zzunknown", "?");
    let store = MemoryStore::new("site");

    push(&store, build.path(), "").await;

    let css = store.get("style.css").expect("css");
    assert_eq!(css.content_type.as_deref(), Some("text/css"));
    assert_eq!(css.access, AccessPolicy::PublicRead);
    let unknown = store.get("notes.zzunknown").expect("unknown");
    assert_eq!(unknown.content_type, None);
    assert_eq!(unknown.access, AccessPolicy::PublicRead);
}

// ---------------------------------------------------------------------------
// 4. Partial failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failing_put_does_not_stop_the_others() {
    let build = build_tree();
    let store = MemoryStore::new("site");
    store.fail_puts("feed.atom", 1);

    let report = push(&store, build.path(), "").await;

    assert_eq!(report.uploaded(), 3);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());
    let failure = report
        .outcomes
        .iter()
        .find_map(|o| match o {
            FileOutcome::Failed { key, error, .. } => Some((key.clone(), error.clone())),
            _ => None,
        })
        .expect("failure outcome");
    assert_eq!(failure.0.expect("key").as_str(), "feed.atom");
    assert!(failure.1.contains("feed.atom"), "error names the key: {}", failure.1);

    // Each key attempted exactly once; nothing retried or rolled back.
    let mut log: Vec<String> = store.put_log().into_iter().map(|k| k.0).collect();
    log.sort();
    assert_eq!(
        log,
        vec!["css/cache_main.3f2a.css", "feed.atom", "img/logo.svg", "index.html"]
    );
    assert!(store.get("index.html").is_some());
    assert!(store.get("feed.atom").is_none());
}

#[tokio::test]
async fn dry_run_reports_plan_without_writing() {
    let build = build_tree();
    let store = MemoryStore::new("site");
    store.insert("index.html", b"<html><body>hi</body></html>");
    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };

    let report = pipeline::run(&store, build.path(), &KeyPrefix::default(), &options)
        .await
        .expect("run");
    assert!(report.dry_run);
    assert_eq!(report.would_upload(), 3);
    assert_eq!(report.unchanged(), 1);
    assert!(store.put_log().is_empty());
}

#[tokio::test]
async fn serial_and_parallel_runs_agree() {
    let build = build_tree();
    for concurrency in [1, 2, 16] {
        let store = MemoryStore::new("site");
        let options = RunOptions {
            concurrency,
            ..RunOptions::default()
        };
        let report = pipeline::run(&store, build.path(), &KeyPrefix::new("v"), &options)
            .await
            .expect("run");
        assert_eq!(
            uploaded_keys(&report),
            vec![
                "v/css/cache_main.3f2a.css",
                "v/feed.atom",
                "v/img/logo.svg",
                "v/index.html",
            ],
            "concurrency {concurrency}"
        );
    }
}

// ---------------------------------------------------------------------------
// 5. Inventory failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inventory_failure_aborts_by_default() {
    let build = build_tree();
    let store = MemoryStore::new("site");
    store.fail_listing(true);

    let err = pipeline::run(&store, build.path(), &KeyPrefix::default(), &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InventoryUnavailable { .. }), "got: {err}");
    assert!(store.put_log().is_empty(), "nothing uploaded without remote state");
}

#[tokio::test]
async fn fail_open_uploads_everything() {
    let build = build_tree();
    let store = MemoryStore::new("site");
    store.insert("index.html", b"<html><body>hi</body></html>");
    store.fail_listing(true);
    let options = RunOptions {
        fail_open: true,
        ..RunOptions::default()
    };

    let report = pipeline::run(&store, build.path(), &KeyPrefix::default(), &options)
        .await
        .expect("run");
    assert!(report.inventory_degraded);
    assert_eq!(report.inventory_size, 0);
    assert_eq!(report.uploaded(), 4);
}

#[tokio::test]
async fn three_pages_merge_into_one_inventory() {
    let store = MemoryStore::new("site").with_page_size(3);
    for i in 0..8 {
        store.insert(&format!("assets/{i}.css"), format!("{i}").as_bytes());
    }

    let inventory = list_inventory(&store, &KeyPrefix::new("assets"))
        .await
        .expect("inventory");
    assert_eq!(inventory.len(), 8);
    assert_eq!(store.list_calls(), 3);
}

/// Claims more results but never hands back a token.
struct BrokenPager;

#[async_trait]
impl ObjectStore for BrokenPager {
    fn bucket(&self) -> &str {
        "broken"
    }

    async fn list_page(
        &self,
        _prefix: &str,
        _continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        Ok(ListPage {
            objects: vec![RemoteObject {
                key: "x".into(),
                fingerprint: "\"00\"".to_string(),
            }],
            truncated: true,
            next: None,
        })
    }

    async fn put_object(&self, _request: &PutObject) -> Result<(), StoreError> {
        Err(StoreError::new("read-only"))
    }
}

/// Claims more results forever but always hands back the same token.
#[derive(Default)]
struct RepeatingPager {
    calls: AtomicUsize,
}

#[async_trait]
impl ObjectStore for RepeatingPager {
    fn bucket(&self) -> &str {
        "looping"
    }

    async fn list_page(
        &self,
        _prefix: &str,
        _continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ListPage {
            objects: Vec::new(),
            truncated: true,
            next: Some("same".to_string()),
        })
    }

    async fn put_object(&self, _request: &PutObject) -> Result<(), StoreError> {
        Err(StoreError::new("read-only"))
    }
}

#[tokio::test]
async fn repeated_continuation_token_is_unavailable() {
    let store = RepeatingPager::default();
    let err = list_inventory(&store, &KeyPrefix::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InventoryUnavailable { .. }), "got: {err}");
    assert!(err.to_string().contains("repeated continuation token"), "got: {err}");
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn truncated_page_without_token_is_unavailable() {
    let err = list_inventory(&BrokenPager, &KeyPrefix::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InventoryUnavailable { .. }), "got: {err}");
    assert!(err.to_string().contains("continuation token"));
}

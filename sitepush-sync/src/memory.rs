//! In-memory [`ObjectStore`] with paging and failure injection.
//!
//! Behaves like a small S3 bucket: listings are lexically ordered and split
//! into pages of `page_size`, and every put stores a quoted MD5 entity tag.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use sitepush_core::{ContentHash, ObjectKey};

use crate::store::{AccessPolicy, ListPage, ObjectStore, PutObject, RemoteObject, StoreError};

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub etag: String,
    pub content_type: Option<String>,
    pub access: AccessPolicy,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    /// Remaining forced failures per key.
    put_failures: HashMap<String, u32>,
    fail_listing: bool,
    put_log: Vec<ObjectKey>,
    list_calls: usize,
}

/// Bucket held in memory.
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    page_size: usize,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            page_size: 1000,
            state: Mutex::new(State::default()),
        }
    }

    /// Split listings into pages of `page_size` objects (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Seed an object with an explicit entity tag.
    pub fn insert_with_etag(&self, key: &str, body: &[u8], etag: &str) {
        self.lock().objects.insert(
            key.to_owned(),
            StoredObject {
                body: body.to_vec(),
                etag: etag.to_owned(),
                content_type: None,
                access: AccessPolicy::Private,
            },
        );
    }

    /// Seed an object the way a single-part upload would store it.
    pub fn insert(&self, key: &str, body: &[u8]) {
        let etag = format!("\"{}\"", ContentHash::of(body));
        self.insert_with_etag(key, body, &etag);
    }

    /// Make the next `times` puts of `key` fail.
    pub fn fail_puts(&self, key: &str, times: u32) {
        self.lock().put_failures.insert(key.to_owned(), times);
    }

    /// Make every listing call fail.
    pub fn fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Every key a put was attempted for, failures included, in call order.
    pub fn put_log(&self) -> Vec<ObjectKey> {
        self.lock().put_log.clone()
    }

    pub fn clear_put_log(&self) {
        self.lock().put_log.clear();
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock can only come from a test assertion;
        // the state itself is still consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.fail_listing {
            return Err(StoreError::new("AccessDenied: listing is not permitted"));
        }

        // The continuation token is the last key of the previous page.
        let matching = state
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation.map_or(true, |after| key.as_str() > after));

        let mut objects = Vec::new();
        let mut truncated = false;
        for (key, object) in matching {
            if objects.len() == self.page_size {
                truncated = true;
                break;
            }
            objects.push(RemoteObject {
                key: ObjectKey::from(key.as_str()),
                fingerprint: object.etag.clone(),
            });
        }

        let next = if truncated {
            objects.last().map(|o| o.key.0.clone())
        } else {
            None
        };
        Ok(ListPage {
            objects,
            truncated,
            next,
        })
    }

    async fn put_object(&self, request: &PutObject) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.put_log.push(request.key.clone());

        if let Some(remaining) = state.put_failures.get_mut(request.key.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::new(format!(
                    "injected failure for {}",
                    request.key
                )));
            }
        }

        let etag = format!("\"{}\"", ContentHash::of(&request.body));
        state.objects.insert(
            request.key.0.clone(),
            StoredObject {
                body: request.body.clone(),
                etag,
                content_type: request.content_type.clone(),
                access: request.access,
            },
        );
        Ok(())
    }
}

//! Storage backend seam.
//!
//! The sync driver only needs two capabilities from a bucket: a paged listing
//! that reports each object's entity tag, and a single-shot put. Anything
//! S3-compatible satisfies both; [`crate::s3::S3Store`] is the production
//! implementation and [`crate::memory::MemoryStore`] backs the tests.

use async_trait::async_trait;
use thiserror::Error;

use sitepush_core::ObjectKey;

/// An object seen in a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: ObjectKey,
    /// Entity tag exactly as the backend reports it (usually quoted MD5 for
    /// single-part uploads). Empty when the backend omits it.
    pub fingerprint: String,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<RemoteObject>,
    /// Whether the backend reported more results after this page.
    pub truncated: bool,
    /// Continuation token for the next page, if any.
    pub next: Option<String>,
}

/// Canned access policy applied on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    PublicRead,
    Private,
}

/// A single put request.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: ObjectKey,
    pub body: Vec<u8>,
    /// `None` leaves the content type to the backend's default.
    pub content_type: Option<String>,
    pub access: AccessPolicy,
}

impl PutObject {
    pub fn content_length(&self) -> u64 {
        self.body.len() as u64
    }
}

/// A failed backend call. The message carries the full cause chain.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Low-level bucket operations, bound to a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket name, for logs and error messages.
    fn bucket(&self) -> &str;

    /// Fetch one page of objects whose key starts with `prefix`.
    ///
    /// `continuation` is `None` for the first page and the previous page's
    /// [`ListPage::next`] afterwards.
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError>;

    /// Upload one object in a single request.
    async fn put_object(&self, request: &PutObject) -> Result<(), StoreError>;
}

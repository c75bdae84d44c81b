//! Remote inventory: the key to entity tag snapshot taken at run start.

use std::collections::{HashMap, HashSet};

use sitepush_core::{ContentHash, KeyPrefix, ObjectKey};

use crate::error::SyncError;
use crate::store::ObjectStore;

/// Whether a local file needs to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDecision {
    Skip,
    Upload,
}

/// Snapshot of the objects under a prefix. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    objects: HashMap<ObjectKey, String>,
}

impl Inventory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn fingerprint(&self, key: &ObjectKey) -> Option<&str> {
        self.objects.get(key).map(String::as_str)
    }

    /// Skip only when an object exists at `key` and its fingerprint contains
    /// the local content hash.
    pub fn decide(&self, key: &ObjectKey, hash: &ContentHash) -> UploadDecision {
        match self.fingerprint(key) {
            Some(fingerprint) if hash.matches(fingerprint) => UploadDecision::Skip,
            _ => UploadDecision::Upload,
        }
    }

    /// Entries sorted by key.
    pub fn entries(&self) -> Vec<(&ObjectKey, &str)> {
        let mut entries: Vec<_> = self
            .objects
            .iter()
            .map(|(k, v)| (k, v.as_str()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl FromIterator<(ObjectKey, String)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (ObjectKey, String)>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

/// List every object under `prefix`, following continuation tokens until the
/// backend reports the listing complete.
///
/// Pages are requested strictly one after another. Any backend failure, or a
/// backend that claims more results without handing back a fresh token,
/// yields [`SyncError::InventoryUnavailable`].
pub async fn list_inventory(
    store: &dyn ObjectStore,
    prefix: &KeyPrefix,
) -> Result<Inventory, SyncError> {
    let list_prefix = prefix.list_prefix();
    let unavailable = |message: String| SyncError::InventoryUnavailable {
        bucket: store.bucket().to_owned(),
        prefix: list_prefix.clone(),
        message,
    };

    let mut objects = HashMap::new();
    let mut seen_tokens = HashSet::new();
    let mut continuation: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list_page(&list_prefix, continuation.as_deref())
            .await
            .map_err(|e| unavailable(e.message))?;
        pages += 1;

        for object in page.objects {
            objects.insert(object.key, object.fingerprint);
        }

        if !page.truncated {
            break;
        }
        match page.next {
            Some(token) if seen_tokens.insert(token.clone()) => continuation = Some(token),
            Some(token) => {
                return Err(unavailable(format!(
                    "backend repeated continuation token {token:?}"
                )))
            }
            None => {
                return Err(unavailable(
                    "backend reported a truncated listing without a continuation token"
                        .to_owned(),
                ))
            }
        }
    }

    tracing::debug!(
        bucket = store.bucket(),
        prefix = %list_prefix,
        pages,
        objects = objects.len(),
        "listed remote inventory"
    );
    Ok(Inventory { objects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn decide_skips_on_quoted_etag() {
        let inventory: Inventory = [(
            ObjectKey::from("index.html"),
            "\"d41d8cd98f00b204e9800998ecf8427e\"".to_owned(),
        )]
        .into_iter()
        .collect();

        let hash = ContentHash::of(b"");
        assert_eq!(
            inventory.decide(&ObjectKey::from("index.html"), &hash),
            UploadDecision::Skip
        );
        assert_eq!(
            inventory.decide(&ObjectKey::from("other.html"), &hash),
            UploadDecision::Upload
        );
    }

    #[test]
    fn decide_uploads_when_fingerprint_differs() {
        let inventory: Inventory = [(ObjectKey::from("a.css"), "\"0000\"".to_owned())]
            .into_iter()
            .collect();
        assert_eq!(
            inventory.decide(&ObjectKey::from("a.css"), &ContentHash::of(b"body{}")),
            UploadDecision::Upload
        );
    }

    #[tokio::test]
    async fn listing_merges_every_page() {
        let store = MemoryStore::new("site").with_page_size(2);
        for i in 0..5 {
            store.insert(&format!("assets/{i}.css"), format!("{i}").as_bytes());
        }
        store.insert("elsewhere/x.css", b"x");

        let inventory = list_inventory(&store, &KeyPrefix::new("assets"))
            .await
            .unwrap();
        assert_eq!(inventory.len(), 5);
        assert_eq!(store.list_calls(), 3);
        assert!(inventory
            .fingerprint(&ObjectKey::from("elsewhere/x.css"))
            .is_none());
    }

    #[tokio::test]
    async fn prefix_does_not_match_sibling_directories() {
        let store = MemoryStore::new("site");
        store.insert("assets/a.css", b"a");
        store.insert("assets-old/a.css", b"a");

        let inventory = list_inventory(&store, &KeyPrefix::new("assets"))
            .await
            .unwrap();
        assert_eq!(inventory.len(), 1);
    }

    #[tokio::test]
    async fn empty_prefix_lists_whole_bucket() {
        let store = MemoryStore::new("site");
        store.insert("index.html", b"<html>");
        store.insert("css/main.css", b"body{}");

        let inventory = list_inventory(&store, &KeyPrefix::default()).await.unwrap();
        assert_eq!(inventory.len(), 2);
    }

    #[tokio::test]
    async fn listing_failure_is_inventory_unavailable() {
        let store = MemoryStore::new("site");
        store.fail_listing(true);

        let err = list_inventory(&store, &KeyPrefix::new("assets"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, SyncError::InventoryUnavailable { .. }),
            "got: {err}"
        );
        assert!(err.to_string().contains("s3://site/assets/"));
    }
}

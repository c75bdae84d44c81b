//! Domain types shared by the inventory lister and the sync driver.
//!
//! Keys are always bucket-relative and use forward slashes, regardless of the
//! host platform's path separator.

use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Key prefix
// ---------------------------------------------------------------------------

/// The remote "directory" every uploaded key is placed under.
///
/// Surrounding slashes are trimmed on construction, so `"assets/"`,
/// `"/assets"` and `"assets"` are the same prefix. An empty prefix means the
/// bucket root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct KeyPrefix(String);

impl KeyPrefix {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().replace('\\', "/").trim_matches('/').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix to hand to a listing call.
    ///
    /// Includes the trailing `/` so that `assets` does not also match
    /// `assets-old/...`.
    pub fn list_prefix(&self) -> String {
        if self.0.is_empty() {
            String::new()
        } else {
            format!("{}/", self.0)
        }
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for KeyPrefix {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for KeyPrefix {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<KeyPrefix> for String {
    fn from(p: KeyPrefix) -> Self {
        p.0
    }
}

// ---------------------------------------------------------------------------
// Object key
// ---------------------------------------------------------------------------

/// A full bucket-relative object key, prefix included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey(pub String);

impl ObjectKey {
    /// Derive the remote key for a path relative to the build root.
    ///
    /// Backslashes become forward slashes and any leading `./` is stripped
    /// before the prefix is joined with a single `/`.
    pub fn from_relative(prefix: &KeyPrefix, relative: &str) -> Self {
        let normalized = normalize_relative(relative);
        if prefix.is_empty() {
            Self(normalized)
        } else {
            Self(format!("{}/{}", prefix.as_str(), normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// `sub\dir\file.css` and `./sub/dir/file.css` both become `sub/dir/file.css`.
pub fn normalize_relative(relative: &str) -> String {
    let slashed = relative.replace('\\', "/");
    let mut rest = slashed.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_owned()
}

// ---------------------------------------------------------------------------
// Content hash
// ---------------------------------------------------------------------------

/// Lowercase hex MD5 digest of a file's bytes.
///
/// MD5 is what S3 reports as the entity tag of a single-part upload, which is
/// the only reason it is used here. It gates change detection, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        let mut h = Md5::new();
        h.update(bytes);
        Self(hex::encode(h.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when a remote fingerprint contains this hash.
    ///
    /// Containment rather than equality: S3 wraps entity tags in quotes and
    /// other backends decorate them further. A multipart tag
    /// (`"<hash-of-hashes>-<parts>"`) never contains the plain digest, so
    /// such objects are always re-uploaded.
    pub fn matches(&self, fingerprint: &str) -> bool {
        !self.0.is_empty() && fingerprint.contains(self.0.as_str())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_hashes_to_well_known_digest() {
        assert_eq!(
            ContentHash::of(b"").as_str(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn quoted_etag_matches_unquoted_hash() {
        let hash = ContentHash::of(b"");
        assert!(hash.matches("\"d41d8cd98f00b204e9800998ecf8427e\""));
        assert!(hash.matches("d41d8cd98f00b204e9800998ecf8427e"));
    }

    #[test]
    fn multipart_etag_does_not_match() {
        let hash = ContentHash::of(b"hello");
        assert_eq!(hash.as_str(), "5d41402abc4b2a76b9719d911017c592");
        assert!(!hash.matches("\"9b2cf535f27731c974343645a3985328-2\""));
        assert!(!hash.matches(""));
    }

    #[test]
    fn prefix_trims_slashes() {
        assert_eq!(KeyPrefix::new("/assets/").as_str(), "assets");
        assert_eq!(KeyPrefix::new("assets").list_prefix(), "assets/");
        assert_eq!(KeyPrefix::new("").list_prefix(), "");
        assert_eq!(KeyPrefix::new("  ").as_str(), "");
    }

    #[test]
    fn leading_dot_slash_is_stripped_repeatedly() {
        assert_eq!(normalize_relative("././a.txt"), "a.txt");
        assert_eq!(normalize_relative(".\\a.txt"), "a.txt");
        assert_eq!(normalize_relative("dir/./a.txt"), "dir/./a.txt");
    }
}

//! Local build tree enumeration.
//!
//! Every regular file under the root is visited exactly once, in file-name
//! order. Directory symlinks are not followed; a symlink that resolves to a
//! regular file is treated as that file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use sitepush_core::{KeyPrefix, ObjectKey};

use crate::error::FileError;

/// A regular file found under the build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute (or root-joined) path used for reading.
    pub path: PathBuf,
    /// Path relative to the build root, as found on disk.
    pub relative: String,
    pub key: ObjectKey,
}

/// Result of walking the build root.
#[derive(Debug, Default)]
pub struct LocalScan {
    pub files: Vec<LocalFile>,
    /// Entries that could not be turned into a [`LocalFile`].
    pub failures: Vec<FileError>,
}

/// Walk `root` and derive the remote key of every regular file.
///
/// Walk errors, non-UTF-8 names and key collisions are collected in
/// [`LocalScan::failures`]; the walk itself always runs to completion.
pub fn scan(root: &Path, prefix: &KeyPrefix) -> LocalScan {
    let mut scan = LocalScan::default();
    let mut taken: HashMap<ObjectKey, PathBuf> = HashMap::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                tracing::warn!(path = %path.display(), error = %err, "walk error");
                scan.failures.push(FileError::Walk { path, source: err });
                continue;
            }
        };

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            continue;
        }

        let path = entry.path().to_path_buf();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let Some(relative) = relative.to_str().map(str::to_owned) else {
            scan.failures.push(FileError::NonUtf8Path { path });
            continue;
        };

        let key = ObjectKey::from_relative(prefix, &relative);
        if let Some(first) = taken.get(&key) {
            scan.failures.push(FileError::DuplicateKey {
                path,
                key,
                first: first.clone(),
            });
            continue;
        }
        taken.insert(key.clone(), path.clone());

        scan.files.push(LocalFile {
            path,
            relative,
            key,
        });
    }

    scan
}

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::fingerprint;

/// Cloud-backed directory holding one document per entity.
///
/// ```text
/// <cloud_dir>/Documents/
/// ├── 6f1c...e2.mealmate
/// ├── 91ab...07.mealmate
/// └── 3d4e...5a.mealmatebook
/// ```
///
/// Shared between the recipe and book stores as `Arc<DocumentCloud>`.
#[derive(Debug)]
pub struct DocumentCloud {
    dir: PathBuf,
    /// Fingerprints of the documents as last written or read by us.
    seen: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl DocumentCloud {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn seen(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Creates the documents directory if needed.
    pub fn ensure_directory(&self) -> bool {
        match fs::create_dir_all(&self.dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Cloud documents unavailable at {}: {}", self.dir.display(), e);
                false
            }
        }
    }

    /// Returns the document path for an entity id.
    pub fn doc_path(&self, id: Uuid, extension: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", id, extension))
    }

    /// Writes one entity document, replacing any previous version.
    pub fn save<T: Serialize>(&self, id: Uuid, extension: &str, value: &T) -> bool {
        let path = self.doc_path(id, extension);
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to encode {}: {}", path.display(), e);
                return false;
            }
        };
        if !self.ensure_directory() {
            return false;
        }

        match fs::write(&path, &bytes) {
            Ok(()) => {
                self.seen().insert(path, fingerprint(&bytes));
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Lists document paths with the given extension, sorted by file name.
    fn list(&self, extension: &str) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(extension) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Decodes every document with the given extension.
    ///
    /// Files that can't be read or decoded are skipped.
    pub fn load_all<T: DeserializeOwned>(&self, extension: &str) -> Vec<T> {
        let paths = match self.list(extension) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut loaded = Vec::with_capacity(paths.len());
        let mut seen = self.seen();
        seen.retain(|path, _| {
            path.extension().and_then(|s| s.to_str()) != Some(extension) || paths.contains(path)
        });
        for path in paths {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping unreadable {}: {}", path.display(), e);
                    continue;
                }
            };
            seen.insert(path.clone(), fingerprint(&bytes));

            match serde_json::from_slice(&bytes) {
                Ok(value) => loaded.push(value),
                Err(e) => tracing::warn!("Skipping undecodable {}: {}", path.display(), e),
            }
        }
        loaded
    }

    /// Removes an entity document. Returns true if it existed.
    pub fn delete(&self, id: Uuid, extension: &str) -> bool {
        let path = self.doc_path(id, extension);
        self.seen().remove(&path);

        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Checks whether documents with the given extension were added,
    /// changed or removed by someone else since we last saw them.
    ///
    /// A missing directory reports no change, so an unmounted cloud folder
    /// never reads as everything deleted.
    pub fn scan_changes(&self, extension: &str) -> bool {
        if !self.dir.is_dir() {
            tracing::debug!("Cloud documents directory {} is missing", self.dir.display());
            return false;
        }
        let paths = match self.list(extension) {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("Failed to list {}: {}", self.dir.display(), e);
                return false;
            }
        };

        let mut current = HashMap::with_capacity(paths.len());
        for path in paths {
            if let Ok(bytes) = fs::read(&path) {
                current.insert(path, fingerprint(&bytes));
            }
        }

        let seen = self.seen();
        let known: HashMap<&PathBuf, &Vec<u8>> = seen
            .iter()
            .filter(|(path, _)| path.extension().and_then(|s| s.to_str()) == Some(extension))
            .collect();

        known.len() != current.len()
            || current
                .iter()
                .any(|(path, print)| known.get(path).map_or(true, |known| *known != print))
    }
}

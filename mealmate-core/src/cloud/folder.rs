//! Key-value cloud backed by a shared folder.
//!
//! The folder is expected to be replicated between devices by an external
//! sync client (iCloud Drive, Dropbox, Syncthing, ...). Layout:
//!
//! ```text
//! <cloud_dir>/
//! ├── SavedIngredients.json
//! ├── DefaultUnits.json
//! ├── SavedKitchenware.json
//! └── SavedShoppingList.json
//! ```
//!
//! Other devices' writes are detected on [`synchronize`](KeyValueCloud::synchronize)
//! by comparing content fingerprints with the last ones seen.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::{fingerprint, ChangeReason, CloudChange, KeyValueCloud, CHANGE_CHANNEL_CAPACITY};

/// File extension for key files.
const KEY_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FolderCloud {
    dir: PathBuf,
    /// Last content fingerprint seen per key, from our writes or a scan.
    seen: Mutex<HashMap<String, Vec<u8>>>,
    scanned: Mutex<bool>,
    sender: broadcast::Sender<CloudChange>,
}

impl FolderCloud {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            dir: dir.into(),
            seen: Mutex::new(HashMap::new()),
            scanned: Mutex::new(false),
            sender,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file holding `key`.
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, KEY_EXTENSION))
    }

    fn seen(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keys become file names, so path separators are rejected.
    fn validate_key(key: &str) -> bool {
        !(key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.starts_with('.'))
    }

    /// Reads every key file currently in the folder.
    fn scan(&self) -> io::Result<HashMap<String, Vec<u8>>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };

        let mut found = HashMap::new();
        for entry in entries {
            let path = entry?.path();

            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some(KEY_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match fs::read(&path) {
                Ok(bytes) => {
                    found.insert(key.to_string(), fingerprint(&bytes));
                }
                Err(e) => tracing::warn!("Skipping unreadable cloud key {}: {}", path.display(), e),
            }
        }
        Ok(found)
    }
}

impl KeyValueCloud for FolderCloud {
    fn set(&self, key: &str, value: Vec<u8>) {
        if !Self::validate_key(key) {
            tracing::warn!("Refusing to write invalid cloud key '{}'", key);
            return;
        }
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!("Cloud folder {} unavailable: {}", self.dir.display(), e);
            return;
        }

        let path = self.key_path(key);
        match fs::write(&path, &value) {
            Ok(()) => {
                self.seen().insert(key.to_string(), fingerprint(&value));
            }
            Err(e) => tracing::warn!("Failed to write cloud key {}: {}", path.display(), e),
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !Self::validate_key(key) {
            return None;
        }
        let path = self.key_path(key);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read cloud key {}: {}", path.display(), e);
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        if !Self::validate_key(key) {
            return;
        }
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                self.seen().remove(key);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove cloud key {}: {}", path.display(), e),
        }
    }

    fn synchronize(&self) -> bool {
        let current = match self.scan() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!("Cloud folder {} unavailable: {}", self.dir.display(), e);
                return false;
            }
        };

        let mut scanned = self.scanned.lock().unwrap_or_else(|p| p.into_inner());
        let reason = if *scanned {
            ChangeReason::ServerChange
        } else {
            ChangeReason::InitialSync
        };
        *scanned = true;

        let mut seen = self.seen();
        let mut changed: Vec<String> = current
            .iter()
            .filter(|(key, print)| seen.get(*key) != Some(*print))
            .map(|(key, _)| key.clone())
            .collect();
        changed.extend(seen.keys().filter(|key| !current.contains_key(*key)).cloned());
        changed.sort();
        *seen = current;
        drop(seen);

        if !changed.is_empty() {
            tracing::debug!("Cloud keys changed externally: {:?}", changed);
            // Ignore send errors (no subscribers)
            let _ = self.sender.send(CloudChange::new(reason, changed));
        }
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<CloudChange> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cloud() -> (FolderCloud, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cloud = FolderCloud::new(temp_dir.path().join("cloud"));
        (cloud, temp_dir)
    }

    #[test]
    fn test_set_get_remove() {
        let (cloud, _temp) = test_cloud();
        assert!(cloud.get("SavedKitchenware").is_none());

        cloud.set("SavedKitchenware", b"[\"Wok\"]".to_vec());
        assert!(cloud.key_path("SavedKitchenware").exists());
        assert_eq!(cloud.get("SavedKitchenware").unwrap(), b"[\"Wok\"]");

        cloud.remove("SavedKitchenware");
        assert!(cloud.get("SavedKitchenware").is_none());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (cloud, temp) = test_cloud();
        cloud.set("../escape", vec![1]);
        assert!(!temp.path().join("escape.json").exists());
        assert!(cloud.get("../escape").is_none());
    }

    #[tokio::test]
    async fn test_own_writes_are_not_external_changes() {
        let (cloud, _temp) = test_cloud();
        let mut rx = cloud.subscribe();

        cloud.set("SavedIngredients", b"[]".to_vec());
        assert!(cloud.synchronize());

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_detects_other_device_writes() {
        let (cloud, _temp) = test_cloud();
        cloud.set("SavedIngredients", b"[]".to_vec());
        cloud.synchronize();
        let mut rx = cloud.subscribe();

        // Another device rewrites the file through the shared folder
        std::fs::write(cloud.key_path("SavedIngredients"), b"[\"Salt\"]").unwrap();
        assert!(cloud.synchronize());

        let change = rx.try_recv().unwrap();
        assert_eq!(change.reason, ChangeReason::ServerChange);
        assert_eq!(change.keys, vec!["SavedIngredients".to_string()]);

        // Nothing new on the next pass
        cloud.synchronize();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_first_scan_reports_initial_sync() {
        let (cloud, temp) = test_cloud();
        let dir = temp.path().join("cloud");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("SavedKitchenware.json"), b"[]").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let mut rx = cloud.subscribe();
        cloud.synchronize();

        let change = rx.try_recv().unwrap();
        assert_eq!(change.reason, ChangeReason::InitialSync);
        assert_eq!(change.keys, vec!["SavedKitchenware".to_string()]);
    }

    #[tokio::test]
    async fn test_external_delete_is_reported() {
        let (cloud, _temp) = test_cloud();
        cloud.set("SavedShoppingList", b"[]".to_vec());
        cloud.synchronize();
        let mut rx = cloud.subscribe();

        std::fs::remove_file(cloud.key_path("SavedShoppingList")).unwrap();
        cloud.synchronize();

        let change = rx.try_recv().unwrap();
        assert!(change.touches("SavedShoppingList"));
    }

    #[test]
    fn test_missing_folder_synchronizes_empty() {
        let (cloud, _temp) = test_cloud();
        assert!(cloud.synchronize());
    }
}

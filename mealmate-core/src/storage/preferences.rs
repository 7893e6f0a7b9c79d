use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::StorageError;

/// Filename of the preference store inside the data directory.
const PREFERENCES_FILE: &str = "preferences.json";

/// Key-value preference store shared by the name and shopping stores.
///
/// Every write rewrites `preferences.json`. Values that fail to decode are
/// reported as absent.
#[derive(Debug)]
pub struct Preferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl Preferences {
    /// Opens the preference store in `data_dir`.
    ///
    /// A missing file starts empty. A corrupt file is logged and also
    /// starts empty; it is replaced on the next write.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(PREFERENCES_FILE);
        let values = match Self::read_file(&path) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Starting with empty preferences: {}", e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, Value>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Decode(path.to_path_buf(), e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(path.to_path_buf(), e)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_file(&self, values: &BTreeMap<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(parent.to_path_buf(), e))?;
        }
        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| StorageError::Encode(self.path.clone(), e))?;
        fs::write(&self.path, bytes).map_err(|e| StorageError::Io(self.path.clone(), e))
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Decodes the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Ignoring undecodable preference '{}': {}", key, e);
                None
            }
        }
    }

    /// Returns the raw JSON value stored under `key`.
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Stores `value` under `key` and persists the store.
    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded =
            serde_json::to_value(value).map_err(|e| StorageError::Encode(self.path.clone(), e))?;
        let mut values = self.lock();
        values.insert(key.to_string(), encoded);
        self.write_file(&values)
    }

    /// Like [`try_set`](Self::try_set), logging failures.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_set(key, value) {
            tracing::warn!("Failed to save preference '{}': {}", key, e);
        }
    }

    /// Removes `key`. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut values = self.lock();
        if values.remove(key).is_none() {
            return false;
        }
        if let Err(e) = self.write_file(&values) {
            tracing::warn!("Failed to persist removal of '{}': {}", key, e);
        }
        true
    }
}

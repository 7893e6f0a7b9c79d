use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::StorageError;

/// JSON file storage rooted in the application data directory.
#[derive(Clone, Debug)]
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    /// Creates a new storage instance with a custom data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the full path for a file name.
    pub fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Checks if a file exists on disk.
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Serializes `value` and writes it, replacing any existing file.
    ///
    /// Creates the data directory if it doesn't exist.
    pub fn try_save<T: Serialize + ?Sized>(&self, value: &T, name: &str) -> Result<(), StorageError> {
        let path = self.path(name);
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::Encode(path.clone(), e))?;

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Io(self.data_dir.clone(), e))?;
        fs::write(&path, bytes).map_err(|e| StorageError::Io(path, e))?;

        Ok(())
    }

    /// Reads and decodes a file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    pub fn try_load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let path = self.path(name);

        match fs::read(&path) {
            Ok(bytes) => {
                let value =
                    serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode(path, e))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }

    /// Saves `value`, logging failures instead of returning them.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T, name: &str) -> bool {
        match self.try_save(value, name) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save {}: {}", name, e);
                false
            }
        }
    }

    /// Loads a value; a missing or corrupt file is treated as absent.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.try_load(name) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", name, e);
                None
            }
        }
    }

    /// Deletes a file.
    ///
    /// Returns `Ok(true)` if the file was deleted, `Ok(false)` if it didn't exist.
    pub fn remove(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.path(name);

        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(path, e)),
        }
    }
}

//! Local persistence.
//!
//! Two adapters back every store:
//! - [`FileStorage`]: one JSON file per collection in the data directory
//!   (`SavedRecipes.json`, `SavedRecipeBooks.json`).
//! - [`Preferences`]: a small key-value preference store kept in
//!   `preferences.json` (ingredient names, kitchenware, shopping list).
//!
//! Both treat a missing or corrupt entry as "no data yet". The `try_*`
//! variants expose the underlying error for callers that want it.

mod file_storage;
mod preferences;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use file_storage::FileStorage;
pub use preferences::Preferences;

/// Errors that can occur during local storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error for {}: {1}", .0.display())]
    Io(PathBuf, #[source] io::Error),

    #[error("Failed to decode {}: {1}", .0.display())]
    Decode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to encode value for {}: {1}", .0.display())]
    Encode(PathBuf, #[source] serde_json::Error),
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::{ChangeReason, CloudChange, KeyValueCloud, CHANGE_CHANNEL_CAPACITY};

/// In-process cloud store.
///
/// Used when no shared folder is configured and in tests, where
/// [`push_external`](MemoryCloud::push_external) plays the other device.
#[derive(Debug)]
pub struct MemoryCloud {
    values: Mutex<HashMap<String, Vec<u8>>>,
    available: AtomicBool,
    sender: broadcast::Sender<CloudChange>,
}

impl MemoryCloud {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            sender,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Simulates the service going offline (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Writes a key as another device would and broadcasts the change.
    pub fn push_external(&self, key: &str, value: Vec<u8>) {
        self.lock().insert(key.to_string(), value);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(CloudChange::new(
            ChangeReason::ServerChange,
            vec![key.to_string()],
        ));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueCloud for MemoryCloud {
    fn set(&self, key: &str, value: Vec<u8>) {
        if !self.is_available() {
            tracing::debug!("Cloud unavailable, dropping write to '{}'", key);
            return;
        }
        self.lock().insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.is_available() {
            return None;
        }
        self.lock().get(key).cloned()
    }

    fn remove(&self, key: &str) {
        if self.is_available() {
            self.lock().remove(key);
        }
    }

    fn synchronize(&self) -> bool {
        self.is_available()
    }

    fn subscribe(&self) -> broadcast::Receiver<CloudChange> {
        self.sender.subscribe()
    }
}

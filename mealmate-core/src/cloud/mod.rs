//! Cloud mirroring.
//!
//! Two flavours of best-effort replication are used:
//!
//! - [`KeyValueCloud`]: a small key-value store shared by every store that
//!   mirrors one aggregate value (ingredient names, kitchenware, the
//!   shopping list). Implementations broadcast a [`CloudChange`] when
//!   another device updates a key.
//! - [`DocumentCloud`]: a cloud-backed directory holding one file per
//!   entity (`<uuid>.mealmate`, `<uuid>.mealmatebook`).
//!
//! Writes are fire-and-forget. Nothing here retries or confirms
//! propagation; an unreachable cloud simply leaves the local copy as the
//! only copy.

mod documents;
mod folder;
mod memory;

use sha2::{Digest, Sha256};
use tokio::sync::broadcast;

pub use documents::DocumentCloud;
pub use folder::FolderCloud;
pub use memory::MemoryCloud;

/// Capacity of change broadcast channels.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Why a set of keys changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Another device wrote the keys.
    ServerChange,
    /// First synchronization after start-up found existing values.
    InitialSync,
    /// The cloud rejected a write because the quota is exhausted.
    QuotaViolation,
    /// The signed-in cloud account changed.
    AccountChange,
}

/// Notification that keys were changed outside this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudChange {
    pub reason: ChangeReason,
    pub keys: Vec<String>,
}

impl CloudChange {
    pub fn new(reason: ChangeReason, keys: Vec<String>) -> Self {
        Self { reason, keys }
    }

    pub fn touches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// A process-wide cloud key-value store.
///
/// Shared between stores as `Arc<dyn KeyValueCloud>`.
pub trait KeyValueCloud: Send + Sync + std::fmt::Debug {
    /// Writes a value. Failures are logged, never returned.
    fn set(&self, key: &str, value: Vec<u8>);

    /// Reads a value; `None` if absent or unreachable.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn remove(&self, key: &str);

    /// Best-effort push/pull. Returns false if the cloud is unreachable.
    fn synchronize(&self) -> bool;

    /// Subscribes to external change notifications.
    fn subscribe(&self) -> broadcast::Receiver<CloudChange>;
}

/// Content fingerprint used to tell our own writes from other devices'.
pub(crate) fn fingerprint(bytes: &[u8]) -> Vec<u8> {
    Sha256::digest(bytes).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_touches() {
        let change = CloudChange::new(
            ChangeReason::ServerChange,
            vec!["SavedIngredients".into(), "DefaultUnits".into()],
        );
        assert!(change.touches("DefaultUnits"));
        assert!(!change.touches("SavedShoppingList"));
    }

    #[test]
    fn test_fingerprint_is_content_based() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
        assert_eq!(fingerprint(b"").len(), 32);
    }
}

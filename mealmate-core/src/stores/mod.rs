//! Entity stores.
//!
//! Each store owns one in-memory collection, persists it after every
//! mutation and publishes a [`StoreEvent`] to subscribers. Persistence
//! failures are logged and never returned; the in-memory state stays
//! authoritative until the next successful write.
//!
//! | Store                 | Local                    | Cloud                      |
//! |-----------------------|--------------------------|----------------------------|
//! | [`RecipeStore`]       | `SavedRecipes.json`      | `<uuid>.mealmate`          |
//! | [`RecipeBookStore`]   | `SavedRecipeBooks.json`  | `<uuid>.mealmatebook`      |
//! | [`IngredientStore`]   | `SavedIngredients`, `DefaultUnits` | same keys        |
//! | [`KitchenwareStore`]  | `SavedKitchenware`       | same key                   |
//! | [`ShoppingListStore`] | `SavedShoppingList`      | same key                   |

mod ingredient_store;
mod kitchenware_store;
mod recipe_book_store;
mod recipe_store;
mod shopping_list_store;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::cloud::{CloudChange, KeyValueCloud, CHANGE_CHANNEL_CAPACITY};
use crate::storage::Preferences;

pub use ingredient_store::IngredientStore;
pub use kitchenware_store::KitchenwareStore;
pub use recipe_book_store::{RecipeBookStore, BOOKS_FILE, BOOK_EXTENSION};
pub use recipe_store::{RecipeStore, RECIPES_FILE, RECIPE_EXTENSION};
pub use shopping_list_store::ShoppingListStore;

/// Where a store's collection came from on the last load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadSource {
    #[default]
    NotLoaded,
    /// Data from the cloud mirror.
    Cloud,
    /// Cloud was absent or empty; local copy used. Also set once a store
    /// that loaded empty saves its first change.
    LocalFallback,
    /// Converted from the legacy preference key.
    Migrated,
    /// Nothing found anywhere.
    Empty,
}

impl LoadSource {
    /// The source after a successful local save.
    pub(crate) fn after_local_save(self) -> Self {
        match self {
            LoadSource::NotLoaded | LoadSource::Empty => LoadSource::LocalFallback,
            other => other,
        }
    }
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadSource::NotLoaded => "not loaded",
            LoadSource::Cloud => "cloud",
            LoadSource::LocalFallback => "local",
            LoadSource::Migrated => "migrated",
            LoadSource::Empty => "empty",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Recipes,
    RecipeBooks,
    Ingredients,
    Kitchenware,
    ShoppingList,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreKind::Recipes => "recipes",
            StoreKind::RecipeBooks => "recipe books",
            StoreKind::Ingredients => "ingredients",
            StoreKind::Kitchenware => "kitchenware",
            StoreKind::ShoppingList => "shopping list",
        };
        write!(f, "{}", s)
    }
}

/// What triggered a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// A mutation made through this process.
    Local,
    /// A reload after another device changed the cloud copy.
    Cloud,
}

/// Published after every change to a store's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEvent {
    pub store: StoreKind,
    pub cause: ChangeCause,
}

/// Broadcast side of a store's change events.
#[derive(Debug)]
pub(crate) struct EventSender {
    store: StoreKind,
    sender: broadcast::Sender<StoreEvent>,
}

impl EventSender {
    pub(crate) fn new(store: StoreKind) -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { store, sender }
    }

    pub(crate) fn notify(&self, cause: ChangeCause) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(StoreEvent {
            store: self.store,
            cause,
        });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

/// Normalizes a saved ingredient or kitchenware name.
///
/// Trims surrounding whitespace and title-cases each word:
/// `"  chicken BREAST "` becomes `"Chicken Breast"`.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Orders entities loaded from per-entity documents.
///
/// Directory listings carry no order, so entities already known keep
/// their position in `previous`; new ones follow, sorted by name.
pub(crate) fn keep_order<T>(
    mut loaded: Vec<T>,
    previous: &[T],
    id: impl Fn(&T) -> Uuid,
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    let positions: HashMap<Uuid, usize> = previous
        .iter()
        .enumerate()
        .map(|(index, entity)| (id(entity), index))
        .collect();

    loaded.sort_by(|a, b| {
        match (positions.get(&id(a)), positions.get(&id(b))) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => name(a).cmp(name(b)),
        }
    });
    loaded
}

/// Why a store is reading its collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadReason {
    /// First load when the store opens. An empty cloud value falls back
    /// to the local copy.
    Open,
    /// Reload after another device wrote the cloud copy. Any decodable
    /// cloud value wins, including an empty one.
    CloudChange,
}

/// Preference keys mirrored to the key-value cloud.
///
/// Writes go to both sides. Reads prefer the cloud value and copy it
/// into preferences.
#[derive(Debug)]
pub(crate) struct KeyMirror {
    prefs: Arc<Preferences>,
    cloud: Option<Arc<dyn KeyValueCloud>>,
    changes: Option<broadcast::Receiver<CloudChange>>,
}

impl KeyMirror {
    /// Subscribes to cloud changes and runs an initial synchronization.
    pub(crate) fn new(prefs: Arc<Preferences>, cloud: Option<Arc<dyn KeyValueCloud>>) -> Self {
        let changes = cloud.as_ref().map(|cloud| {
            let rx = cloud.subscribe();
            if !cloud.synchronize() {
                tracing::debug!("Cloud unavailable, continuing with local data");
            }
            rx
        });
        Self {
            prefs,
            cloud,
            changes,
        }
    }

    pub(crate) fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Some(cloud) = &self.cloud {
            match serde_json::to_vec(value) {
                Ok(bytes) => cloud.set(key, bytes),
                Err(e) => tracing::warn!("Failed to encode '{}' for cloud: {}", key, e),
            }
        }
        self.prefs.set(key, value);
    }

    /// Reads `key` from the cloud, then from preferences.
    ///
    /// On [`LoadReason::Open`] a cloud value counts only if `is_empty`
    /// says it holds something. A cloud value that counts is written
    /// through to preferences.
    pub(crate) fn load<T: DeserializeOwned + Serialize>(
        &self,
        key: &str,
        reason: LoadReason,
        is_empty: impl Fn(&T) -> bool,
    ) -> (Option<T>, LoadSource) {
        if let Some(value) = self.load_cloud(key) {
            if reason == LoadReason::CloudChange || !is_empty(&value) {
                self.prefs.set(key, &value);
                return (Some(value), LoadSource::Cloud);
            }
        }
        match self.prefs.get::<T>(key) {
            Some(value) => (Some(value), LoadSource::LocalFallback),
            None => (None, LoadSource::Empty),
        }
    }

    /// Reads `key` from the cloud only.
    pub(crate) fn load_cloud<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.cloud.as_ref()?.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring undecodable cloud value '{}': {}", key, e);
                None
            }
        }
    }

    /// Drains pending cloud notifications.
    ///
    /// Returns true if any of them touched one of `keys`. A lagged
    /// receiver counts as a change since notifications were lost.
    pub(crate) fn take_changes(&mut self, keys: &[&str]) -> bool {
        let Some(rx) = self.changes.as_mut() else {
            return false;
        };

        let mut touched = false;
        loop {
            match rx.try_recv() {
                Ok(change) => touched |= keys.iter().any(|key| change.touches(key)),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {} cloud notifications", skipped);
                    touched = true;
                }
                Err(_) => break,
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MemoryCloud;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("chicken breast"), "Chicken Breast");
        assert_eq!(normalize_name(" Chicken Breast "), "Chicken Breast");
        assert_eq!(normalize_name("CHICKEN BREAST"), "Chicken Breast");
        assert_eq!(normalize_name("olive   oil"), "Olive Oil");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_normalize_name_is_idempotent() {
        let once = normalize_name("  sOY sauce ");
        assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn test_mirror_prefers_non_empty_cloud() {
        let temp = TempDir::new().unwrap();
        let prefs = Arc::new(Preferences::open(temp.path()));
        prefs.set("SavedKitchenware", &vec!["Local Pan"]);

        let cloud = Arc::new(MemoryCloud::new());
        cloud.set("SavedKitchenware", b"[\"Cloud Wok\"]".to_vec());
        let mirror = KeyMirror::new(prefs.clone(), Some(cloud.clone()));

        let (items, source) =
            mirror.load::<Vec<String>>("SavedKitchenware", LoadReason::Open, Vec::is_empty);
        assert_eq!(items.unwrap(), vec!["Cloud Wok"]);
        assert_eq!(source, LoadSource::Cloud);
        assert_eq!(prefs.get::<Vec<String>>("SavedKitchenware").unwrap(), vec!["Cloud Wok"]);
    }

    #[test]
    fn test_mirror_open_falls_back_on_empty_cloud() {
        let temp = TempDir::new().unwrap();
        let prefs = Arc::new(Preferences::open(temp.path()));
        prefs.set("SavedKitchenware", &vec!["Local Pan"]);

        let cloud = Arc::new(MemoryCloud::new());
        cloud.set("SavedKitchenware", b"[]".to_vec());
        let mirror = KeyMirror::new(prefs.clone(), Some(cloud));

        let (items, source) =
            mirror.load::<Vec<String>>("SavedKitchenware", LoadReason::Open, Vec::is_empty);
        assert_eq!(items.unwrap(), vec!["Local Pan"]);
        assert_eq!(source, LoadSource::LocalFallback);
    }

    #[test]
    fn test_mirror_cloud_change_accepts_empty_value() {
        let temp = TempDir::new().unwrap();
        let prefs = Arc::new(Preferences::open(temp.path()));
        prefs.set("SavedKitchenware", &vec!["Local Pan"]);

        let cloud = Arc::new(MemoryCloud::new());
        cloud.set("SavedKitchenware", b"[]".to_vec());
        let mirror = KeyMirror::new(prefs.clone(), Some(cloud));

        let (items, source) =
            mirror.load::<Vec<String>>("SavedKitchenware", LoadReason::CloudChange, Vec::is_empty);
        assert!(items.unwrap().is_empty());
        assert_eq!(source, LoadSource::Cloud);
        assert!(prefs.get::<Vec<String>>("SavedKitchenware").unwrap().is_empty());
    }

    #[test]
    fn test_after_local_save() {
        assert_eq!(LoadSource::Empty.after_local_save(), LoadSource::LocalFallback);
        assert_eq!(LoadSource::Cloud.after_local_save(), LoadSource::Cloud);
        assert_eq!(LoadSource::Migrated.after_local_save(), LoadSource::Migrated);
    }

    #[test]
    fn test_mirror_without_cloud() {
        let temp = TempDir::new().unwrap();
        let prefs = Arc::new(Preferences::open(temp.path()));
        let mut mirror = KeyMirror::new(prefs, None);

        let (items, source) =
            mirror.load::<Vec<String>>("SavedKitchenware", LoadReason::Open, Vec::is_empty);
        assert!(items.is_none());
        assert_eq!(source, LoadSource::Empty);

        mirror.save("SavedKitchenware", &vec!["Wok"]);
        let (_, source) =
            mirror.load::<Vec<String>>("SavedKitchenware", LoadReason::CloudChange, Vec::is_empty);
        assert_eq!(source, LoadSource::LocalFallback);
        assert!(!mirror.take_changes(&["SavedKitchenware"]));
    }

    #[test]
    fn test_take_changes_filters_keys() {
        let temp = TempDir::new().unwrap();
        let prefs = Arc::new(Preferences::open(temp.path()));
        let cloud = Arc::new(MemoryCloud::new());
        let mut mirror = KeyMirror::new(prefs, Some(cloud.clone()));

        cloud.push_external("SavedShoppingList", b"[]".to_vec());
        assert!(!mirror.take_changes(&["SavedKitchenware"]));

        cloud.push_external("SavedKitchenware", b"[]".to_vec());
        assert!(mirror.take_changes(&["SavedKitchenware"]));
        assert!(!mirror.take_changes(&["SavedKitchenware"]));
    }

    #[test]
    fn test_keep_order() {
        let a = (Uuid::new_v4(), "Zucchini Bread");
        let b = (Uuid::new_v4(), "Apple Pie");
        let c = (Uuid::new_v4(), "Curry");
        let d = (Uuid::new_v4(), "Bagels");

        let previous = vec![a, b, c];
        let loaded = vec![d, c, a, b];
        let ordered = keep_order(loaded, &previous, |e| e.0, |e| e.1);

        assert_eq!(ordered, vec![a, b, c, d]);
    }

    #[test]
    fn test_event_sender() {
        let events = EventSender::new(StoreKind::Kitchenware);
        events.notify(ChangeCause::Local);

        let mut rx = events.subscribe();
        events.notify(ChangeCause::Cloud);
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent {
                store: StoreKind::Kitchenware,
                cause: ChangeCause::Cloud
            }
        );
    }
}

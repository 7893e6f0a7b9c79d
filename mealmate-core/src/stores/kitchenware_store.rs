use std::sync::Arc;
use tokio::sync::broadcast;

use super::{
    normalize_name, ChangeCause, EventSender, KeyMirror, LoadReason, LoadSource, StoreEvent,
    StoreKind,
};
use crate::cloud::KeyValueCloud;
use crate::storage::Preferences;

const KITCHENWARE_KEY: &str = "SavedKitchenware";

/// Known kitchenware names, in the order they were added.
#[derive(Debug)]
pub struct KitchenwareStore {
    items: Vec<String>,
    mirror: KeyMirror,
    source: LoadSource,
    events: EventSender,
}

impl KitchenwareStore {
    pub fn open(prefs: Arc<Preferences>, cloud: Option<Arc<dyn KeyValueCloud>>) -> Self {
        let mut store = Self {
            items: Vec::new(),
            mirror: KeyMirror::new(prefs, cloud),
            source: LoadSource::NotLoaded,
            events: EventSender::new(StoreKind::Kitchenware),
        };
        store.load(LoadReason::Open);
        store
    }

    fn load(&mut self, reason: LoadReason) {
        let (items, source) = self
            .mirror
            .load::<Vec<String>>(KITCHENWARE_KEY, reason, Vec::is_empty);
        self.items = items.unwrap_or_default();
        self.source = source;
        tracing::debug!("Loaded {} kitchenware items ({})", self.items.len(), source);
    }

    fn changed(&mut self) {
        self.mirror.save(KITCHENWARE_KEY, &self.items);
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item == name)
    }

    /// Appends a name unless its normalized form is already known.
    pub fn add(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        if name.is_empty() || self.position(&name).is_some() {
            return false;
        }
        self.items.push(name);
        self.changed();
        true
    }

    /// Renames an item in place.
    ///
    /// No-op if `old_name` is unknown or the new name is already taken by
    /// another item.
    pub fn update(&mut self, old_name: &str, new_name: &str) -> bool {
        let old_name = normalize_name(old_name);
        let new_name = normalize_name(new_name);
        if new_name.is_empty() {
            return false;
        }
        if new_name != old_name && self.position(&new_name).is_some() {
            tracing::debug!("Not renaming '{}': '{}' already exists", old_name, new_name);
            return false;
        }

        let Some(index) = self.position(&old_name) else {
            return false;
        };
        if self.items[index] == new_name {
            return false;
        }
        self.items[index] = new_name;
        self.changed();
        true
    }

    pub fn delete(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        let before = self.items.len();
        self.items.retain(|item| *item != name);
        if self.items.len() == before {
            return false;
        }
        self.changed();
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(&normalize_name(name)).is_some()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Reloads from the cloud if another device changed the list.
    pub fn process_cloud_changes(&mut self) -> bool {
        if !self.mirror.take_changes(&[KITCHENWARE_KEY]) {
            return false;
        }
        self.load(LoadReason::CloudChange);
        self.events.notify(ChangeCause::Cloud);
        true
    }
}

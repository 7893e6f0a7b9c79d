use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{
    normalize_name, ChangeCause, EventSender, KeyMirror, LoadReason, LoadSource, StoreEvent,
    StoreKind,
};
use crate::cloud::KeyValueCloud;
use crate::models::Unit;
use crate::storage::Preferences;

const INGREDIENTS_KEY: &str = "SavedIngredients";
const DEFAULT_UNITS_KEY: &str = "DefaultUnits";

/// Known ingredient names with a default unit for each.
///
/// Feeds the ingredient pickers. Names are copies, not references:
/// renaming one here doesn't touch existing recipes.
#[derive(Debug)]
pub struct IngredientStore {
    names: BTreeSet<String>,
    default_units: BTreeMap<String, Unit>,
    mirror: KeyMirror,
    source: LoadSource,
    events: EventSender,
}

impl IngredientStore {
    /// Opens the store and loads saved names.
    pub fn open(prefs: Arc<Preferences>, cloud: Option<Arc<dyn KeyValueCloud>>) -> Self {
        let mut store = Self {
            names: BTreeSet::new(),
            default_units: BTreeMap::new(),
            mirror: KeyMirror::new(prefs, cloud),
            source: LoadSource::NotLoaded,
            events: EventSender::new(StoreKind::Ingredients),
        };
        store.load(LoadReason::Open);
        store
    }

    fn load(&mut self, reason: LoadReason) {
        let (names, source) = self
            .mirror
            .load::<Vec<String>>(INGREDIENTS_KEY, reason, Vec::is_empty);
        self.names = names.unwrap_or_default().into_iter().collect();

        // Units follow wherever the names came from
        let units_reason = match source {
            LoadSource::Cloud => LoadReason::CloudChange,
            _ => reason,
        };
        let units = self
            .mirror
            .load(DEFAULT_UNITS_KEY, units_reason, BTreeMap::is_empty)
            .0;
        self.default_units = units.unwrap_or_default();
        self.source = source;
        tracing::debug!("Loaded {} ingredient names ({})", self.names.len(), source);
    }

    fn save(&self) {
        let names: Vec<&String> = self.names.iter().collect();
        self.mirror.save(INGREDIENTS_KEY, &names);
        self.mirror.save(DEFAULT_UNITS_KEY, &self.default_units);
    }

    fn changed(&mut self) {
        self.save();
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
    }

    /// Adds a name with its default unit.
    ///
    /// Returns false if the normalized name is empty or already known.
    pub fn add(&mut self, name: &str, unit: Unit) -> bool {
        let name = normalize_name(name);
        if name.is_empty() || self.names.contains(&name) {
            return false;
        }
        self.default_units.insert(name.clone(), unit);
        self.names.insert(name);
        self.changed();
        true
    }

    /// Adds a name, or refreshes the default unit of a known one.
    pub fn upsert(&mut self, name: &str, unit: Unit) -> bool {
        let name = normalize_name(name);
        if name.is_empty() {
            return false;
        }
        if self.names.contains(&name) && self.default_units.get(&name) == Some(&unit) {
            return false;
        }
        self.default_units.insert(name.clone(), unit);
        self.names.insert(name);
        self.changed();
        true
    }

    /// Renames `old_name` and sets its default unit.
    ///
    /// No-op (returns false) if `old_name` is unknown or if the new name
    /// already belongs to a different entry.
    pub fn update(&mut self, old_name: &str, new_name: &str, unit: Unit) -> bool {
        let old_name = normalize_name(old_name);
        let new_name = normalize_name(new_name);

        if new_name.is_empty() || !self.names.contains(&old_name) {
            return false;
        }
        if new_name != old_name && self.names.contains(&new_name) {
            tracing::debug!("Not renaming '{}': '{}' already exists", old_name, new_name);
            return false;
        }

        self.names.remove(&old_name);
        self.default_units.remove(&old_name);
        self.default_units.insert(new_name.clone(), unit);
        self.names.insert(new_name);
        self.changed();
        true
    }

    /// Removes a name and its default unit.
    pub fn delete(&mut self, name: &str) -> bool {
        let name = normalize_name(name);
        if !self.names.remove(&name) {
            return false;
        }
        self.default_units.remove(&name);
        self.changed();
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&normalize_name(name))
    }

    pub fn default_unit(&self, name: &str) -> Option<Unit> {
        self.default_units.get(&normalize_name(name)).copied()
    }

    /// Known names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Reloads from the cloud if another device changed our keys.
    pub fn process_cloud_changes(&mut self) -> bool {
        if !self.mirror.take_changes(&[INGREDIENTS_KEY, DEFAULT_UNITS_KEY]) {
            return false;
        }
        self.load(LoadReason::CloudChange);
        self.events.notify(ChangeCause::Cloud);
        true
    }
}

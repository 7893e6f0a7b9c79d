use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{ChangeCause, EventSender, KeyMirror, LoadReason, LoadSource, StoreEvent, StoreKind};
use crate::cloud::KeyValueCloud;
use crate::models::{Ingredient, ShoppingCategory, ShoppingItem, Unit};
use crate::storage::Preferences;

const SHOPPING_LIST_KEY: &str = "SavedShoppingList";

/// The shopping list.
///
/// Items with the same name and unit are kept as one row with the
/// amounts summed. Name matching is exact, so "milk" and "Milk" are
/// separate rows.
#[derive(Debug)]
pub struct ShoppingListStore {
    items: Vec<ShoppingItem>,
    mirror: KeyMirror,
    source: LoadSource,
    events: EventSender,
}

impl ShoppingListStore {
    pub fn open(prefs: Arc<Preferences>, cloud: Option<Arc<dyn KeyValueCloud>>) -> Self {
        let mut store = Self {
            items: Vec::new(),
            mirror: KeyMirror::new(prefs, cloud),
            source: LoadSource::NotLoaded,
            events: EventSender::new(StoreKind::ShoppingList),
        };
        store.load(LoadReason::Open);
        store
    }

    fn load(&mut self, reason: LoadReason) {
        let (items, source) = self
            .mirror
            .load::<Vec<ShoppingItem>>(SHOPPING_LIST_KEY, reason, Vec::is_empty);
        self.items = items.unwrap_or_default();
        self.source = source;
        tracing::debug!("Loaded {} shopping items ({})", self.items.len(), source);
    }

    fn changed(&mut self) {
        self.mirror.save(SHOPPING_LIST_KEY, &self.items);
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn merge(&mut self, item: ShoppingItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.name == item.name && existing.unit == item.unit)
        {
            Some(existing) => existing.amount += item.amount,
            None => self.items.push(item),
        }
    }

    /// Adds an item, summing into an existing row with the same name and unit.
    pub fn add_item(&mut self, item: ShoppingItem) {
        self.merge(item);
        self.changed();
    }

    /// Adds every ingredient of a recipe, aggregating as [`add_item`](Self::add_item) does.
    pub fn add_recipe_ingredients(&mut self, ingredients: &[Ingredient]) {
        if ingredients.is_empty() {
            return;
        }
        for ingredient in ingredients {
            self.merge(ShoppingItem::from_ingredient(ingredient));
        }
        self.changed();
    }

    pub fn toggle_item(&mut self, id: Uuid) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.items[index].is_checked = !self.items[index].is_checked;
        self.changed();
        true
    }

    pub fn remove_item(&mut self, id: Uuid) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.items.remove(index);
        self.changed();
        true
    }

    /// Replaces amount and unit, keeping the checked state and category.
    pub fn update_item(&mut self, id: Uuid, amount: f64, unit: Unit) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let item = &mut self.items[index];
        item.amount = amount;
        item.unit = unit;
        self.changed();
        true
    }

    /// Removes every checked item. Returns how many were removed.
    pub fn complete_shopping_run(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.is_checked);
        let removed = before - self.items.len();
        if removed > 0 {
            self.changed();
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
        self.changed();
    }

    pub fn has_checked_items(&self) -> bool {
        self.items.iter().any(|item| item.is_checked)
    }

    pub fn get(&self, id: Uuid) -> Option<&ShoppingItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    /// Groups items by category, in aisle order. Empty groups are omitted.
    pub fn items_by_category(&self) -> Vec<(ShoppingCategory, Vec<&ShoppingItem>)> {
        ShoppingCategory::ALL
            .iter()
            .map(|category| {
                let items: Vec<&ShoppingItem> = self
                    .items
                    .iter()
                    .filter(|item| item.category == *category)
                    .collect();
                (*category, items)
            })
            .filter(|(_, items)| !items.is_empty())
            .collect()
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Reloads from the cloud if another device changed the list.
    pub fn process_cloud_changes(&mut self) -> bool {
        if !self.mirror.take_changes(&[SHOPPING_LIST_KEY]) {
            return false;
        }
        self.load(LoadReason::CloudChange);
        self.events.notify(ChangeCause::Cloud);
        true
    }
}

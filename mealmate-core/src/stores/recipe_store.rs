use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    keep_order, ChangeCause, EventSender, IngredientStore, KitchenwareStore, LoadSource,
    StoreEvent, StoreKind,
};
use crate::cloud::DocumentCloud;
use crate::models::{deserialize_count, ImageData, Ingredient, Recipe, RecipeError};
use crate::storage::{FileStorage, Preferences};

/// Local snapshot of every recipe.
pub const RECIPES_FILE: &str = "SavedRecipes.json";

/// Extension of per-recipe cloud documents and exported recipes.
pub const RECIPE_EXTENSION: &str = "mealmate";

/// Preference key used before recipes moved to their own file.
const LEGACY_RECIPES_KEY: &str = "SavedRecipes";

/// First-release recipe layout: ingredients were plain strings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecipe {
    id: Uuid,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(deserialize_with = "deserialize_count")]
    cook_time: u32,
    #[serde(deserialize_with = "deserialize_count")]
    servings: u32,
    #[serde(default)]
    is_favorite: bool,
    #[serde(default)]
    kitchenware: Vec<String>,
    #[serde(default)]
    image_data: Option<ImageData>,
}

impl From<LegacyRecipe> for Recipe {
    fn from(legacy: LegacyRecipe) -> Self {
        let mut recipe = Recipe::new(legacy.name, legacy.cook_time, legacy.servings)
            .with_description(legacy.description)
            .with_ingredients(legacy.ingredients.into_iter().map(Ingredient::named).collect())
            .with_instructions(legacy.instructions)
            .with_kitchenware(legacy.kitchenware);
        recipe.id = legacy.id;
        recipe.is_favorite = legacy.is_favorite;
        recipe.image_data = legacy.image_data;
        recipe
    }
}

/// Decodes the legacy preference value, trying the current layout first.
fn decode_legacy(value: Value) -> Option<Vec<Recipe>> {
    match serde_json::from_value::<Vec<Recipe>>(value.clone()) {
        Ok(recipes) => Some(recipes),
        Err(current_err) => match serde_json::from_value::<Vec<LegacyRecipe>>(value) {
            Ok(legacy) => Some(legacy.into_iter().map(Recipe::from).collect()),
            Err(legacy_err) => {
                tracing::warn!(
                    "Legacy recipes unreadable (current format: {}; first-release format: {})",
                    current_err,
                    legacy_err
                );
                None
            }
        },
    }
}

/// The recipe collection.
///
/// Owns the ingredient and kitchenware name stores: saving a recipe
/// teaches them every name it uses.
#[derive(Debug)]
pub struct RecipeStore {
    recipes: Vec<Recipe>,
    storage: FileStorage,
    prefs: Arc<Preferences>,
    documents: Option<Arc<DocumentCloud>>,
    ingredients: IngredientStore,
    kitchenware: KitchenwareStore,
    source: LoadSource,
    events: EventSender,
}

impl RecipeStore {
    pub fn open(
        storage: FileStorage,
        prefs: Arc<Preferences>,
        documents: Option<Arc<DocumentCloud>>,
        ingredients: IngredientStore,
        kitchenware: KitchenwareStore,
    ) -> Self {
        let mut store = Self {
            recipes: Vec::new(),
            storage,
            prefs,
            documents,
            ingredients,
            kitchenware,
            source: LoadSource::NotLoaded,
            events: EventSender::new(StoreKind::Recipes),
        };
        store.load();
        store
    }

    fn load(&mut self) {
        let local: Option<Vec<Recipe>> = self.storage.load(RECIPES_FILE);

        if let Some(documents) = &self.documents {
            documents.ensure_directory();
            let from_cloud: Vec<Recipe> = documents.load_all(RECIPE_EXTENSION);
            if !from_cloud.is_empty() {
                let previous = local.unwrap_or_default();
                self.recipes = keep_order(from_cloud, &previous, |r| r.id, |r| r.name.as_str());
                self.source = LoadSource::Cloud;
                self.storage.save(&self.recipes, RECIPES_FILE);
                tracing::debug!("Loaded {} recipes from cloud", self.recipes.len());
                return;
            }
        }

        if let Some(recipes) = local {
            self.recipes = recipes;
            self.source = LoadSource::LocalFallback;
            // Seed an empty cloud so partial writes can't shadow the rest
            if let Some(documents) = &self.documents {
                for recipe in &self.recipes {
                    documents.save(recipe.id, RECIPE_EXTENSION, recipe);
                }
            }
            tracing::debug!("Loaded {} recipes from {}", self.recipes.len(), RECIPES_FILE);
            return;
        }

        self.source = self.migrate_legacy();
    }

    fn migrate_legacy(&mut self) -> LoadSource {
        let Some(value) = self.prefs.get_raw(LEGACY_RECIPES_KEY) else {
            return LoadSource::Empty;
        };
        let Some(recipes) = decode_legacy(value) else {
            return LoadSource::Empty;
        };

        tracing::info!("Migrated {} recipes from legacy preferences", recipes.len());
        self.recipes = recipes;
        self.persist_all();
        self.prefs.remove(LEGACY_RECIPES_KEY);
        LoadSource::Migrated
    }

    fn persist_all(&self) {
        if let Some(documents) = &self.documents {
            for recipe in &self.recipes {
                documents.save(recipe.id, RECIPE_EXTENSION, recipe);
            }
        }
        self.storage.save(&self.recipes, RECIPES_FILE);
    }

    fn persist(&mut self, recipe: &Recipe) {
        if let Some(documents) = &self.documents {
            documents.save(recipe.id, RECIPE_EXTENSION, recipe);
        }
        self.storage.save(&self.recipes, RECIPES_FILE);
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
    }

    /// Teaches the name stores every ingredient and kitchenware name used.
    fn learn_names(&mut self, recipe: &Recipe) {
        let step_ingredients = recipe.step_ingredients.values().flatten();
        for ingredient in recipe.ingredients.iter().chain(step_ingredients) {
            self.ingredients.upsert(&ingredient.name, ingredient.unit);
        }
        for item in &recipe.kitchenware {
            self.kitchenware.add(item);
        }
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.recipes.iter().position(|recipe| recipe.id == id)
    }

    /// Appends a recipe.
    ///
    /// Recipes whose step photos or step ingredients point past the last
    /// instruction are rejected. Adding an id that is already present
    /// replaces the stored recipe.
    pub fn add(&mut self, recipe: Recipe) -> Result<(), RecipeError> {
        recipe.validate()?;
        self.learn_names(&recipe);

        match self.index_of(recipe.id) {
            Some(index) => self.recipes[index] = recipe.clone(),
            None => self.recipes.push(recipe.clone()),
        }
        self.persist(&recipe);
        Ok(())
    }

    /// Replaces the recipe with the same id.
    ///
    /// Returns `Ok(false)` if no such recipe exists.
    pub fn update(&mut self, recipe: Recipe) -> Result<bool, RecipeError> {
        recipe.validate()?;
        let Some(index) = self.index_of(recipe.id) else {
            return Ok(false);
        };

        self.learn_names(&recipe);
        self.recipes[index] = recipe.clone();
        self.persist(&recipe);
        Ok(true)
    }

    /// Removes a recipe and its cloud document.
    ///
    /// Books referencing the recipe are not touched here; see
    /// [`Library::delete_recipe`](crate::Library::delete_recipe).
    pub fn delete(&mut self, id: Uuid) -> Option<Recipe> {
        let index = self.index_of(id)?;
        let removed = self.recipes.remove(index);

        if let Some(documents) = &self.documents {
            documents.delete(id, RECIPE_EXTENSION);
        }
        self.storage.save(&self.recipes, RECIPES_FILE);
        self.source = self.source.after_local_save();
        self.events.notify(ChangeCause::Local);
        Some(removed)
    }

    /// Flips the favorite flag. Returns the new value.
    pub fn toggle_favorite(&mut self, id: Uuid) -> Option<bool> {
        let index = self.index_of(id)?;
        let mut recipe = self.recipes[index].clone();
        recipe.is_favorite = !recipe.is_favorite;
        let favorite = recipe.is_favorite;

        self.recipes[index] = recipe.clone();
        self.persist(&recipe);
        Some(favorite)
    }

    pub fn get(&self, id: Uuid) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| recipe.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.index_of(id).is_some()
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn ingredients(&self) -> &IngredientStore {
        &self.ingredients
    }

    pub fn ingredients_mut(&mut self) -> &mut IngredientStore {
        &mut self.ingredients
    }

    pub fn kitchenware(&self) -> &KitchenwareStore {
        &self.kitchenware
    }

    pub fn kitchenware_mut(&mut self) -> &mut KitchenwareStore {
        &mut self.kitchenware
    }

    pub fn documents(&self) -> Option<&Arc<DocumentCloud>> {
        self.documents.as_ref()
    }

    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Replaces the collection with recipes read from the cloud documents
    /// after another device changed them.
    ///
    /// An empty read replaces too: the other device deleted everything.
    pub fn replace_from_cloud(&mut self, recipes: Vec<Recipe>) -> bool {
        self.recipes = keep_order(recipes, &self.recipes, |r| r.id, |r| r.name.as_str());
        self.source = LoadSource::Cloud;
        self.storage.save(&self.recipes, RECIPES_FILE);
        self.events.notify(ChangeCause::Cloud);
        true
    }

    /// Reloads from the cloud documents if another device changed them.
    pub fn refresh_from_cloud(&mut self) -> bool {
        let Some(documents) = self.documents.clone() else {
            return false;
        };
        if !documents.scan_changes(RECIPE_EXTENSION) {
            return false;
        }
        let recipes = documents.load_all(RECIPE_EXTENSION);
        self.replace_from_cloud(recipes)
    }

    /// Applies pending key-value cloud changes to the name stores.
    pub fn process_cloud_changes(&mut self) -> bool {
        let ingredients = self.ingredients.process_cloud_changes();
        let kitchenware = self.kitchenware.process_cloud_changes();
        ingredients || kitchenware
    }
}

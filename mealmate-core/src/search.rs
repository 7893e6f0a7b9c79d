//! Recipe filtering and selection helpers used by the list screens.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{BookContents, Recipe, RecipeBook, RecipeCategory};

/// Filter applied to the recipe list.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub category: Option<RecipeCategory>,
    pub favorites_only: bool,
    /// Case-insensitive substring matched against name and description.
    pub search: Option<String>,
}

impl RecipeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: RecipeCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn favorites_only(mut self) -> Self {
        self.favorites_only = true;
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(category) = self.category {
            if recipe.category != category {
                return false;
            }
        }
        if self.favorites_only && !recipe.is_favorite {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let text = text.to_lowercase();
                recipe.name.to_lowercase().contains(&text)
                    || recipe.description.to_lowercase().contains(&text)
            }
            _ => true,
        }
    }

    pub fn apply<'a>(&self, recipes: &'a [Recipe]) -> Vec<&'a Recipe> {
        recipes.iter().filter(|recipe| self.matches(recipe)).collect()
    }
}

/// Recipes that could still be added to `book`.
pub fn recipes_not_in_book<'a>(book: &RecipeBook, recipes: &'a [Recipe]) -> Vec<&'a Recipe> {
    recipes
        .iter()
        .filter(|recipe| !book.contains_recipe(recipe.id))
        .collect()
}

/// Picks up to `count` distinct recipes from the given categories.
///
/// An empty category list means every category.
pub fn pick_random<'a, R: Rng + ?Sized>(
    recipes: &'a [Recipe],
    categories: &[RecipeCategory],
    count: usize,
    rng: &mut R,
) -> Vec<&'a Recipe> {
    let mut available: Vec<&Recipe> = recipes
        .iter()
        .filter(|recipe| categories.is_empty() || categories.contains(&recipe.category))
        .collect();
    available.shuffle(rng);
    available.truncate(count);
    available
}

/// The recipes a book shows.
///
/// Snapshot books show their embedded copies. Reference books show the
/// live recipes they list, in collection order; ids of deleted recipes
/// are skipped.
pub fn resolve_book_recipes<'a>(book: &'a RecipeBook, recipes: &'a [Recipe]) -> Vec<&'a Recipe> {
    match &book.contents {
        BookContents::Snapshot(snapshot) => snapshot.iter().collect(),
        BookContents::Reference(ids) => recipes
            .iter()
            .filter(|recipe| ids.contains(&recipe.id))
            .collect(),
    }
}

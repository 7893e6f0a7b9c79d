//! Recipe books.
//!
//! A book either references recipes owned by the local recipe store
//! (reference mode) or embeds full recipe copies (snapshot mode, used
//! for `.mealmatebook` exports and imports). The two modes are a
//! tagged variant so a book can never be in both or neither.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::image_data::ImageData;
use super::recipe::Recipe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BookColor {
    Red,
    Orange,
    Yellow,
    Green,
    #[default]
    Blue,
    Purple,
    Pink,
}

impl BookColor {
    pub const ALL: [BookColor; 7] = [
        BookColor::Red,
        BookColor::Orange,
        BookColor::Yellow,
        BookColor::Green,
        BookColor::Blue,
        BookColor::Purple,
        BookColor::Pink,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|color| color.to_string().to_lowercase() == needle)
    }
}

impl fmt::Display for BookColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookColor::Red => "Red",
            BookColor::Orange => "Orange",
            BookColor::Yellow => "Yellow",
            BookColor::Green => "Green",
            BookColor::Blue => "Blue",
            BookColor::Purple => "Purple",
            BookColor::Pink => "Pink",
        };
        write!(f, "{}", name)
    }
}

/// What a book holds.
#[derive(Debug, Clone, PartialEq)]
pub enum BookContents {
    /// Ids resolved against the live recipe collection.
    Reference(Vec<Uuid>),
    /// Embedded recipe copies, independent of the live collection.
    Snapshot(Vec<Recipe>),
}

impl Default for BookContents {
    fn default() -> Self {
        BookContents::Reference(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecipeBookWire", into = "RecipeBookWire")]
pub struct RecipeBook {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_data: Option<ImageData>,
    pub color: BookColor,
    pub contents: BookContents,
}

impl RecipeBook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            image_data: None,
            color: BookColor::default(),
            contents: BookContents::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_color(mut self, color: BookColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_recipe_ids(mut self, ids: Vec<Uuid>) -> Self {
        self.contents = BookContents::Reference(ids);
        self
    }

    pub fn with_snapshot(mut self, recipes: Vec<Recipe>) -> Self {
        self.contents = BookContents::Snapshot(recipes);
        self
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self.contents, BookContents::Snapshot(_))
    }

    /// Ids of the recipes in the book, in either mode.
    pub fn recipe_ids(&self) -> Vec<Uuid> {
        match &self.contents {
            BookContents::Reference(ids) => ids.clone(),
            BookContents::Snapshot(recipes) => recipes.iter().map(|r| r.id).collect(),
        }
    }

    pub fn contains_recipe(&self, recipe_id: Uuid) -> bool {
        match &self.contents {
            BookContents::Reference(ids) => ids.contains(&recipe_id),
            BookContents::Snapshot(recipes) => recipes.iter().any(|r| r.id == recipe_id),
        }
    }

    /// Converts a snapshot book to reference mode, keeping the recipe ids
    /// and discarding the embedded copies.
    pub fn materialize_references(&mut self) {
        if let BookContents::Snapshot(recipes) = &self.contents {
            let ids = recipes.iter().map(|r| r.id).collect();
            self.contents = BookContents::Reference(ids);
        }
    }

    /// Adds a recipe id, converting a snapshot book to reference mode first.
    /// Returns false if the id was already present.
    pub fn add_recipe_id(&mut self, recipe_id: Uuid) -> bool {
        self.materialize_references();
        match &mut self.contents {
            BookContents::Reference(ids) if !ids.contains(&recipe_id) => {
                ids.push(recipe_id);
                true
            }
            _ => false,
        }
    }

    /// Removes a recipe id, converting a snapshot book to reference mode first.
    pub fn remove_recipe_id(&mut self, recipe_id: Uuid) -> bool {
        self.materialize_references();
        match &mut self.contents {
            BookContents::Reference(ids) => {
                let len_before = ids.len();
                ids.retain(|id| *id != recipe_id);
                ids.len() != len_before
            }
            BookContents::Snapshot(_) => false,
        }
    }

    pub fn recipe_count(&self) -> usize {
        match &self.contents {
            BookContents::Reference(ids) => ids.len(),
            BookContents::Snapshot(recipes) => recipes.len(),
        }
    }
}

/// On-disk shape shared with `.mealmatebook` files.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeBookWire {
    id: Uuid,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    recipe_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_data: Option<ImageData>,
    #[serde(default)]
    color: BookColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exported_recipes: Option<Vec<Recipe>>,
}

impl From<RecipeBookWire> for RecipeBook {
    fn from(wire: RecipeBookWire) -> Self {
        let contents = match wire.exported_recipes {
            Some(recipes) => BookContents::Snapshot(recipes),
            None => BookContents::Reference(wire.recipe_ids),
        };
        Self {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            image_data: wire.image_data,
            color: wire.color,
            contents,
        }
    }
}

impl From<RecipeBook> for RecipeBookWire {
    fn from(book: RecipeBook) -> Self {
        let recipe_ids = book.recipe_ids();
        let exported_recipes = match book.contents {
            BookContents::Reference(_) => None,
            BookContents::Snapshot(recipes) => Some(recipes),
        };
        Self {
            id: book.id,
            name: book.name,
            description: book.description,
            recipe_ids,
            image_data: book.image_data,
            color: book.color,
            exported_recipes,
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::image_data::ImageData;
use super::ingredient::Ingredient;

/// Meal category a recipe is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecipeCategory {
    Breakfast,
    Lunch,
    #[default]
    Dinner,
    Dessert,
    Snack,
    Drink,
}

impl RecipeCategory {
    pub const ALL: [RecipeCategory; 6] = [
        RecipeCategory::Breakfast,
        RecipeCategory::Lunch,
        RecipeCategory::Dinner,
        RecipeCategory::Dessert,
        RecipeCategory::Snack,
        RecipeCategory::Drink,
    ];

    /// Symbol name of the icon shown next to the category.
    pub fn icon(&self) -> &'static str {
        match self {
            RecipeCategory::Breakfast => "sun.and.horizon",
            RecipeCategory::Lunch => "sun.max",
            RecipeCategory::Dinner => "moon.stars",
            RecipeCategory::Dessert => "birthday.cake",
            RecipeCategory::Snack => "carrot",
            RecipeCategory::Drink => "cup.and.saucer",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RecipeCategory::Breakfast => "orange",
            RecipeCategory::Lunch => "blue",
            RecipeCategory::Dinner => "purple",
            RecipeCategory::Dessert => "pink",
            RecipeCategory::Snack => "green",
            RecipeCategory::Drink => "mint",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.to_string().to_lowercase() == needle)
    }
}

impl fmt::Display for RecipeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecipeCategory::Breakfast => "Breakfast",
            RecipeCategory::Lunch => "Lunch",
            RecipeCategory::Dinner => "Dinner",
            RecipeCategory::Dessert => "Dessert",
            RecipeCategory::Snack => "Snack",
            RecipeCategory::Drink => "Drink",
        };
        write!(f, "{}", name)
    }
}

/// A recipe whose step maps point outside its instruction list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecipeError {
    #[error("step photo for step {step} but recipe has {count} instruction(s)")]
    StepPhotoOutOfRange { step: usize, count: usize },

    #[error("step ingredients for step {step} but recipe has {count} instruction(s)")]
    StepIngredientsOutOfRange { step: usize, count: usize },
}

/// Reads a signed count, clamping negatives to 0.
///
/// Files written by older clients store cook time and servings as
/// signed integers.
pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

/// A recipe. Equality is by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(deserialize_with = "deserialize_count")]
    pub cook_time: u32, // minutes
    #[serde(deserialize_with = "deserialize_count")]
    pub servings: u32,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub kitchenware: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<ImageData>,
    #[serde(default)]
    pub category: RecipeCategory,
    /// Photo per instruction step, keyed by step index.
    #[serde(default)]
    pub step_photos: BTreeMap<usize, ImageData>,
    /// Ingredients used per instruction step, keyed by step index.
    #[serde(default)]
    pub step_ingredients: BTreeMap<usize, Vec<Ingredient>>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, cook_time: u32, servings: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            cook_time,
            servings,
            is_favorite: false,
            kitchenware: Vec::new(),
            image_data: None,
            category: RecipeCategory::default(),
            step_photos: BTreeMap::new(),
            step_ingredients: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn with_instructions(mut self, instructions: Vec<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn with_kitchenware(mut self, kitchenware: Vec<String>) -> Self {
        self.kitchenware = kitchenware;
        self
    }

    pub fn with_category(mut self, category: RecipeCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image_data = Some(image);
        self
    }

    pub fn with_step_photo(mut self, step: usize, photo: ImageData) -> Self {
        self.step_photos.insert(step, photo);
        self
    }

    pub fn with_step_ingredients(mut self, step: usize, ingredients: Vec<Ingredient>) -> Self {
        self.step_ingredients.insert(step, ingredients);
        self
    }

    /// Checks that every step-map key indexes into `instructions`.
    pub fn validate(&self) -> Result<(), RecipeError> {
        let count = self.instructions.len();
        if let Some(&step) = self.step_photos.keys().find(|&&step| step >= count) {
            return Err(RecipeError::StepPhotoOutOfRange { step, count });
        }
        if let Some(&step) = self.step_ingredients.keys().find(|&&step| step >= count) {
            return Err(RecipeError::StepIngredientsOutOfRange { step, count });
        }
        Ok(())
    }

    /// Ingredients attached to one instruction step.
    pub fn ingredients_for_step(&self, step: usize) -> &[Ingredient] {
        self.step_ingredients
            .get(&step)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Recipe {}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let star = if self.is_favorite { " ★" } else { "" };
        writeln!(f, "{}{}", self.name, star)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "Category: {}", self.category)?;
        writeln!(f, "Cook time: {} min", self.cook_time)?;
        writeln!(f, "Servings: {}", self.servings)?;

        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for ingredient in &self.ingredients {
                writeln!(f, "  - {}", ingredient)?;
            }
        }

        if !self.kitchenware.is_empty() {
            writeln!(f, "\nKitchenware: {}", self.kitchenware.join(", "))?;
        }

        if !self.instructions.is_empty() {
            writeln!(f, "\nInstructions:")?;
            for (i, step) in self.instructions.iter().enumerate() {
                let photo = if self.step_photos.contains_key(&i) {
                    " [photo]"
                } else {
                    ""
                };
                writeln!(f, "  {}. {}{}", i + 1, step, photo)?;
                for ingredient in self.ingredients_for_step(i) {
                    writeln!(f, "       uses {}", ingredient)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;

    fn pancakes() -> Recipe {
        Recipe::new("Pancakes", 20, 4)
            .with_category(RecipeCategory::Breakfast)
            .with_ingredients(vec![
                Ingredient::new("Flour", 200.0, Unit::Gram),
                Ingredient::new("Milk", 300.0, Unit::Milliliter),
            ])
            .with_instructions(vec!["Mix".to_string(), "Fry".to_string()])
    }

    #[test]
    fn test_recipe_builder() {
        let recipe = pancakes().with_kitchenware(vec!["Pan".into()]);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.instructions.len(), 2);
        assert_eq!(recipe.category, RecipeCategory::Breakfast);
        assert!(!recipe.is_favorite);
    }

    #[test]
    fn test_validate_accepts_in_range_steps() {
        let recipe = pancakes()
            .with_step_photo(1, ImageData::new(vec![1, 2, 3]))
            .with_step_ingredients(0, vec![Ingredient::named("Flour")]);
        assert!(recipe.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_steps() {
        let recipe = pancakes().with_step_photo(2, ImageData::new(vec![1]));
        assert_eq!(
            recipe.validate(),
            Err(RecipeError::StepPhotoOutOfRange { step: 2, count: 2 })
        );

        let recipe = pancakes().with_step_ingredients(5, vec![]);
        assert_eq!(
            recipe.validate(),
            Err(RecipeError::StepIngredientsOutOfRange { step: 5, count: 2 })
        );
    }

    #[test]
    fn test_wire_format_uses_camel_case_and_string_step_keys() {
        let recipe = pancakes().with_step_photo(1, ImageData::new(b"x".to_vec()));
        let value = serde_json::to_value(&recipe).unwrap();

        assert_eq!(value["cookTime"], 20);
        assert_eq!(value["isFavorite"], false);
        assert_eq!(value["category"], "Breakfast");
        assert_eq!(value["stepPhotos"]["1"], "eA==");
        assert!(value.get("imageData").is_none());
    }

    #[test]
    fn test_decodes_minimal_document() {
        let json = r#"{
            "id": "E621E1F8-C36C-495A-93FC-0C247A3E6E5F",
            "name": "Toast",
            "cookTime": 5,
            "servings": 1
        }"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.name, "Toast");
        assert_eq!(recipe.category, RecipeCategory::Dinner);
        assert!(recipe.step_photos.is_empty());
    }

    #[test]
    fn test_decodes_signed_counts() {
        let json = r#"{
            "id": "E621E1F8-C36C-495A-93FC-0C247A3E6E5F",
            "name": "Water",
            "cookTime": -1,
            "servings": 9999999999
        }"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.cook_time, 0);
        assert_eq!(recipe.servings, u32::MAX);

        let bad = json.replace("-1", "\"soon\"");
        assert!(serde_json::from_str::<Recipe>(&bad).is_err());
    }

    #[test]
    fn test_category_parse_and_display() {
        assert_eq!(RecipeCategory::parse("dessert"), Some(RecipeCategory::Dessert));
        assert_eq!(RecipeCategory::parse("brunch"), None);
        assert_eq!(RecipeCategory::Drink.to_string(), "Drink");
        assert_eq!(RecipeCategory::Drink.icon(), "cup.and.saucer");
    }

    #[test]
    fn test_recipe_display() {
        let output = format!("{}", pancakes());
        assert!(output.contains("Pancakes"));
        assert!(output.contains("Servings: 4"));
        assert!(output.contains("200 g Flour"));
        assert!(output.contains("2. Fry"));
    }
}

//! Shopping list entries.
//!
//! Items are usually created from recipe ingredients and carry a store
//! aisle category inferred from the item name.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ingredient::{format_amount, Ingredient, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ShoppingCategory {
    Produce,
    Dairy,
    Meat,
    Pantry,
    Frozen,
    Bakery,
    Beverages,
    #[default]
    Other,
}

/// Keyword rules checked in order; the first rule with a keyword
/// contained in the lowercased name wins.
const CATEGORY_RULES: &[(ShoppingCategory, &[&str])] = &[
    (ShoppingCategory::Dairy, &["milk", "cheese", "yogurt"]),
    (ShoppingCategory::Produce, &["apple", "banana", "lettuce"]),
    (ShoppingCategory::Meat, &["chicken", "beef", "fish"]),
    (ShoppingCategory::Bakery, &["bread", "bun", "roll"]),
    (ShoppingCategory::Frozen, &["frozen"]),
    (ShoppingCategory::Beverages, &["juice", "soda", "water"]),
];

impl ShoppingCategory {
    pub const ALL: [ShoppingCategory; 8] = [
        ShoppingCategory::Produce,
        ShoppingCategory::Dairy,
        ShoppingCategory::Meat,
        ShoppingCategory::Pantry,
        ShoppingCategory::Frozen,
        ShoppingCategory::Bakery,
        ShoppingCategory::Beverages,
        ShoppingCategory::Other,
    ];

    /// Infers the aisle category from an item name.
    pub fn infer(name: &str) -> Self {
        let lowered = name.to_lowercase();
        CATEGORY_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(ShoppingCategory::Other)
    }
}

impl fmt::Display for ShoppingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShoppingCategory::Produce => "Produce",
            ShoppingCategory::Dairy => "Dairy",
            ShoppingCategory::Meat => "Meat",
            ShoppingCategory::Pantry => "Pantry",
            ShoppingCategory::Frozen => "Frozen",
            ShoppingCategory::Bakery => "Bakery",
            ShoppingCategory::Beverages => "Beverages",
            ShoppingCategory::Other => "Other",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: Unit,
    #[serde(default)]
    pub is_checked: bool,
    #[serde(default)]
    pub category: ShoppingCategory,
}

impl ShoppingItem {
    /// Creates an unchecked item with the category inferred from its name.
    pub fn new(name: impl Into<String>, amount: f64, unit: Unit) -> Self {
        let name = name.into();
        let category = ShoppingCategory::infer(&name);
        Self {
            id: Uuid::new_v4(),
            name,
            amount,
            unit,
            is_checked: false,
            category,
        }
    }

    pub fn with_category(mut self, category: ShoppingCategory) -> Self {
        self.category = category;
        self
    }

    pub fn from_ingredient(ingredient: &Ingredient) -> Self {
        Self::new(ingredient.name.clone(), ingredient.amount, ingredient.unit)
    }
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.is_checked { "[x]" } else { "[ ]" };
        write!(
            f,
            "{} {:<25} {} {}",
            check,
            self.name,
            format_amount(self.amount),
            self.unit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_category() {
        assert_eq!(ShoppingCategory::infer("Whole Milk"), ShoppingCategory::Dairy);
        assert_eq!(ShoppingCategory::infer("Frozen Peas"), ShoppingCategory::Frozen);
        assert_eq!(ShoppingCategory::infer("Paper Towels"), ShoppingCategory::Other);
        assert_eq!(ShoppingCategory::infer("CHICKEN thighs"), ShoppingCategory::Meat);
        assert_eq!(ShoppingCategory::infer("Sparkling Water"), ShoppingCategory::Beverages);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // "milk" (dairy) is checked before "bread" (bakery)
        assert_eq!(ShoppingCategory::infer("Milk Bread"), ShoppingCategory::Dairy);
        // "fish" (meat) is checked before "frozen"
        assert_eq!(ShoppingCategory::infer("Frozen Fish"), ShoppingCategory::Meat);
    }

    #[test]
    fn test_from_ingredient() {
        let ingredient = Ingredient::new("Cheddar Cheese", 200.0, Unit::Gram);
        let item = ShoppingItem::from_ingredient(&ingredient);

        assert_eq!(item.name, "Cheddar Cheese");
        assert_eq!(item.amount, 200.0);
        assert_eq!(item.unit, Unit::Gram);
        assert_eq!(item.category, ShoppingCategory::Dairy);
        assert!(!item.is_checked);
        assert_ne!(item.id, ingredient.id);
    }

    #[test]
    fn test_wire_format() {
        let item = ShoppingItem::new("Bananas", 6.0, Unit::Piece);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["isChecked"], false);
        assert_eq!(value["category"], "Produce");
        assert_eq!(value["unit"], "pc");
    }

    #[test]
    fn test_display() {
        let mut item = ShoppingItem::new("Rolls", 4.0, Unit::Piece);
        item.is_checked = true;
        let output = format!("{}", item);
        assert!(output.starts_with("[x] Rolls"));
        assert!(output.ends_with("4 pc"));
    }
}

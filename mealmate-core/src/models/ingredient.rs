use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Unit of measure for an ingredient or shopping item.
///
/// Serialized as the short symbol (`"g"`, `"tbsp"`, ...) used in
/// `.mealmate` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    #[serde(rename = "pc")]
    Piece,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "tbsp")]
    Tablespoon,
    #[serde(rename = "tsp")]
    Teaspoon,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "pinch")]
    Pinch,
    #[serde(rename = "dash")]
    Dash,
    #[serde(rename = "fl oz")]
    FluidOunce,
    #[serde(rename = "pt")]
    Pint,
    #[serde(rename = "qt")]
    Quart,
    #[serde(rename = "gal")]
    Gallon,
}

impl Unit {
    pub const ALL: [Unit; 16] = [
        Unit::Piece,
        Unit::Gram,
        Unit::Kilogram,
        Unit::Milliliter,
        Unit::Liter,
        Unit::Tablespoon,
        Unit::Teaspoon,
        Unit::Cup,
        Unit::Ounce,
        Unit::Pound,
        Unit::Pinch,
        Unit::Dash,
        Unit::FluidOunce,
        Unit::Pint,
        Unit::Quart,
        Unit::Gallon,
    ];

    /// Short symbol, identical to the serialized form.
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Piece => "pc",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Tablespoon => "tbsp",
            Unit::Teaspoon => "tsp",
            Unit::Cup => "cup",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Pinch => "pinch",
            Unit::Dash => "dash",
            Unit::FluidOunce => "fl oz",
            Unit::Pint => "pt",
            Unit::Quart => "qt",
            Unit::Gallon => "gal",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Unit::Piece => "Piece",
            Unit::Gram => "Gram",
            Unit::Kilogram => "Kilogram",
            Unit::Milliliter => "Milliliter",
            Unit::Liter => "Liter",
            Unit::Tablespoon => "Tablespoon",
            Unit::Teaspoon => "Teaspoon",
            Unit::Cup => "Cup",
            Unit::Ounce => "Ounce",
            Unit::Pound => "Pound",
            Unit::Pinch => "Pinch",
            Unit::Dash => "Dash",
            Unit::FluidOunce => "Fluid Ounce",
            Unit::Pint => "Pint",
            Unit::Quart => "Quart",
            Unit::Gallon => "Gallon",
        }
    }

    /// Parse from a symbol or display name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|unit| {
            unit.symbol() == needle || unit.display_name().to_lowercase() == needle
        })
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

fn default_amount() -> f64 {
    1.0
}

/// An ingredient line of a recipe.
///
/// Equality and hashing use the id only, so two lines with the same
/// name and amount are still distinct ingredients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default)]
    pub unit: Unit,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, amount: f64, unit: Unit) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            unit,
        }
    }

    /// An ingredient with the default amount (one piece).
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, default_amount(), Unit::Piece)
    }
}

impl PartialEq for Ingredient {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Ingredient {}

impl Hash for Ingredient {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            format_amount(self.amount),
            self.unit,
            self.name
        )
    }
}

/// Format an amount, dropping the fraction when it is whole.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

mod book;
mod config_cmd;
mod ingredient;
mod kitchenware;
mod open;
mod random;
mod recipe;
mod shopping;
mod watch;

pub use book::BookCommand;
pub use config_cmd::ConfigCommand;
pub use ingredient::IngredientCommand;
pub use kitchenware::KitchenwareCommand;
pub use open::OpenCommand;
pub use random::RandomCommand;
pub use recipe::RecipeCommand;
pub use shopping::ShoppingCommand;
pub use watch::WatchCommand;

use clap::ValueEnum;
use std::error::Error;
use uuid::Uuid;

use mealmate_core::{
    BookColor, Ingredient, Library, Recipe, RecipeBook, RecipeCategory, ShoppingCategory, Unit,
};

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub type CommandResult = Result<(), Box<dyn Error>>;

/// Finds a recipe by id, then by case-insensitive name.
pub fn find_recipe<'a>(library: &'a Library, identifier: &str) -> Result<&'a Recipe, Box<dyn Error>> {
    let recipes = library.recipes();
    let found = match Uuid::parse_str(identifier) {
        Ok(id) => recipes.get(id),
        Err(_) => {
            let name = identifier.trim().to_lowercase();
            recipes
                .recipes()
                .iter()
                .find(|r| r.name.to_lowercase() == name)
        }
    };
    found.ok_or_else(|| format!("Recipe not found: {}", identifier).into())
}

/// Finds a recipe book by id, then by case-insensitive name.
pub fn find_book<'a>(library: &'a Library, identifier: &str) -> Result<&'a RecipeBook, Box<dyn Error>> {
    let books = library.books();
    let found = match Uuid::parse_str(identifier) {
        Ok(id) => books.get(id),
        Err(_) => {
            let name = identifier.trim().to_lowercase();
            books.books().iter().find(|b| b.name.to_lowercase() == name)
        }
    };
    found.ok_or_else(|| format!("Recipe book not found: {}", identifier).into())
}

pub fn parse_unit(s: &str) -> Result<Unit, Box<dyn Error>> {
    Unit::parse(s).ok_or_else(|| {
        let known: Vec<&str> = Unit::ALL.iter().map(|u| u.symbol()).collect();
        format!("Unknown unit '{}' (expected one of: {})", s, known.join(", ")).into()
    })
}

pub fn parse_category(s: &str) -> Result<RecipeCategory, Box<dyn Error>> {
    RecipeCategory::parse(s).ok_or_else(|| {
        let known: Vec<String> = RecipeCategory::ALL.iter().map(|c| c.to_string()).collect();
        format!("Unknown category '{}' (expected one of: {})", s, known.join(", ")).into()
    })
}

pub fn parse_color(s: &str) -> Result<BookColor, Box<dyn Error>> {
    BookColor::parse(s).ok_or_else(|| {
        let known: Vec<String> = BookColor::ALL.iter().map(|c| c.to_string()).collect();
        format!("Unknown color '{}' (expected one of: {})", s, known.join(", ")).into()
    })
}

pub fn parse_shopping_category(s: &str) -> Result<ShoppingCategory, Box<dyn Error>> {
    let needle = s.trim().to_lowercase();
    ShoppingCategory::ALL
        .into_iter()
        .find(|c| c.to_string().to_lowercase() == needle)
        .ok_or_else(|| format!("Unknown shopping category '{}'", s).into())
}

/// Parses an ingredient written the way recipes print them:
/// `"200 g Flour"`, `"1.5 fl oz Rum"`, or just `"Salt"`.
///
/// A leading number without a known unit after it counts pieces.
pub fn parse_ingredient(s: &str) -> Result<Ingredient, Box<dyn Error>> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let Some((first, rest)) = tokens.split_first() else {
        return Err("Ingredient cannot be empty".into());
    };

    let Ok(amount) = first.parse::<f64>() else {
        return Ok(Ingredient::named(tokens.join(" ")));
    };
    if !amount.is_finite() || amount <= 0.0 {
        return Err(format!("Amount must be a positive number: {}", s).into());
    }

    // Two-word units ("fl oz") win over one-word ones
    let (unit, name) = match rest {
        [a, b, name @ ..] if Unit::parse(&format!("{} {}", a, b)).is_some() => {
            (Unit::parse(&format!("{} {}", a, b)), name)
        }
        [a, name @ ..] if Unit::parse(a).is_some() => (Unit::parse(a), name),
        name => (None, name),
    };

    if name.is_empty() {
        return Err(format!("Ingredient is missing a name: {}", s).into());
    }
    Ok(Ingredient::new(
        name.join(" "),
        amount,
        unit.unwrap_or(Unit::Piece),
    ))
}

/// Splits a `STEP=VALUE` argument; steps are numbered from 1 on the
/// command line and from 0 in the model.
pub fn parse_step_arg(s: &str) -> Result<(usize, &str), Box<dyn Error>> {
    let (step, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected STEP=VALUE, got '{}'", s))?;
    let step: usize = step
        .trim()
        .parse()
        .map_err(|_| format!("Invalid step number: {}", step))?;
    if step == 0 {
        return Err("Steps are numbered from 1".into());
    }
    Ok((step - 1, value.trim()))
}

/// Shortens `name` to `width` characters for table output.
pub fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() > width {
        let kept: String = name.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient_full() {
        let ingredient = parse_ingredient("200 g Plain Flour").unwrap();
        assert_eq!(ingredient.name, "Plain Flour");
        assert_eq!(ingredient.amount, 200.0);
        assert_eq!(ingredient.unit, Unit::Gram);
    }

    #[test]
    fn test_parse_ingredient_two_word_unit() {
        let ingredient = parse_ingredient("1.5 fl oz Dark Rum").unwrap();
        assert_eq!(ingredient.name, "Dark Rum");
        assert_eq!(ingredient.amount, 1.5);
        assert_eq!(ingredient.unit, Unit::FluidOunce);
    }

    #[test]
    fn test_parse_ingredient_without_unit_counts_pieces() {
        let ingredient = parse_ingredient("3 eggs").unwrap();
        assert_eq!(ingredient.name, "eggs");
        assert_eq!(ingredient.amount, 3.0);
        assert_eq!(ingredient.unit, Unit::Piece);
    }

    #[test]
    fn test_parse_ingredient_name_only() {
        let ingredient = parse_ingredient("  sea   salt ").unwrap();
        assert_eq!(ingredient.name, "sea salt");
        assert_eq!(ingredient.amount, 1.0);
        assert_eq!(ingredient.unit, Unit::Piece);
    }

    #[test]
    fn test_parse_ingredient_errors() {
        assert!(parse_ingredient("   ").is_err());
        assert!(parse_ingredient("2 cup").is_err());
        assert!(parse_ingredient("-1 g sugar").is_err());
    }

    #[test]
    fn test_parse_step_arg() {
        assert_eq!(parse_step_arg("2=100 g butter").unwrap(), (1, "100 g butter"));
        assert!(parse_step_arg("0=x").is_err());
        assert!(parse_step_arg("two=x").is_err());
        assert!(parse_step_arg("no separator").is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_unit("TBSP").unwrap(), Unit::Tablespoon);
        assert!(parse_unit("handful").is_err());
        assert_eq!(parse_category("dessert").unwrap(), RecipeCategory::Dessert);
        assert_eq!(parse_color("Green").unwrap(), BookColor::Green);
        assert_eq!(
            parse_shopping_category("beverages").unwrap(),
            ShoppingCategory::Beverages
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Short", 10), "Short");
        assert_eq!(truncate("A very long recipe name", 10), "A very ...");
    }

    #[test]
    fn test_find_recipe_by_id_or_name() {
        let temp = tempfile::tempdir().unwrap();
        let mut library = Library::open(temp.path(), None, None);
        let recipe = Recipe::new("Banana Bread", 60, 8);
        library.recipes_mut().add(recipe.clone()).unwrap();

        assert_eq!(find_recipe(&library, &recipe.id.to_string()).unwrap().id, recipe.id);
        assert_eq!(find_recipe(&library, "banana bread").unwrap().id, recipe.id);
        assert!(find_recipe(&library, "Sourdough").is_err());
    }
}

//! Shopping list CLI commands.
//!
//! Items are grouped by aisle; adding an item that is already on the list
//! with the same unit bumps its amount instead of adding a second row.

use clap::{Args, Subcommand};
use std::error::Error;
use std::io::{self, Write};
use uuid::Uuid;

use mealmate_core::{Library, ShoppingItem};

use super::{find_recipe, parse_shopping_category, parse_unit, CommandResult, OutputFormat};

#[derive(Args)]
pub struct ShoppingCommand {
    #[command(subcommand)]
    pub command: ShoppingSubcommand,
}

#[derive(Subcommand)]
pub enum ShoppingSubcommand {
    /// Show the shopping list grouped by category
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add an item to the shopping list
    Add {
        /// Item name
        name: String,

        /// Amount
        #[arg(long, short, default_value_t = 1.0)]
        amount: f64,

        /// Unit (e.g. "g", "cup", "pc")
        #[arg(long, short, default_value = "pc")]
        unit: String,

        /// Category; inferred from the name when omitted
        #[arg(long)]
        category: Option<String>,
    },

    /// Add every ingredient of a recipe
    AddRecipe {
        /// Recipe ID (UUID) or name
        recipe: String,
    },

    /// Check or uncheck an item
    Toggle {
        /// Item ID (UUID) or name
        item: String,
    },

    /// Change an item's amount or unit
    Update {
        /// Item ID (UUID) or name
        item: String,

        /// New amount
        #[arg(long, short)]
        amount: Option<f64>,

        /// New unit
        #[arg(long, short)]
        unit: Option<String>,
    },

    /// Remove an item
    Remove {
        /// Item ID (UUID) or name
        item: String,
    },

    /// Finish a shopping run: drop every checked item
    Complete,

    /// Remove every item
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Finds an item by id, then by case-insensitive name.
fn find_item<'a>(library: &'a Library, identifier: &str) -> Result<&'a ShoppingItem, Box<dyn Error>> {
    let shopping = library.shopping();
    let found = match Uuid::parse_str(identifier) {
        Ok(id) => shopping.get(id),
        Err(_) => {
            let name = identifier.trim().to_lowercase();
            shopping
                .items()
                .iter()
                .find(|item| item.name.to_lowercase() == name)
        }
    };
    found.ok_or_else(|| format!("Shopping item not found: {}", identifier).into())
}

fn check_amount(amount: f64) -> Result<f64, Box<dyn Error>> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err("Amount must be a positive number".into());
    }
    Ok(amount)
}

impl ShoppingCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        match &self.command {
            ShoppingSubcommand::List { format } => {
                let shopping = library.shopping();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(shopping.items())?);
                    }
                    OutputFormat::Text => {
                        println!("Shopping List");
                        println!("{}", "=".repeat(44));

                        let groups = shopping.items_by_category();
                        if groups.is_empty() {
                            println!("No items on the list.");
                            return Ok(());
                        }

                        for (category, items) in groups {
                            println!("\n{}", category);
                            println!("{}", "-".repeat(44));
                            for item in items {
                                println!("{}", item);
                            }
                        }

                        let checked = shopping.items().iter().filter(|i| i.is_checked).count();
                        println!(
                            "\n{} item(s), {} checked",
                            shopping.items().len(),
                            checked
                        );
                        if shopping.has_checked_items() {
                            println!("Run 'mealmate shopping complete' when you're done shopping.");
                        }
                    }
                }
                Ok(())
            }

            ShoppingSubcommand::Add {
                name,
                amount,
                unit,
                category,
            } => {
                if name.trim().is_empty() {
                    return Err("Item name cannot be empty".into());
                }
                let amount = check_amount(*amount)?;
                let unit = parse_unit(unit)?;

                let mut item = ShoppingItem::new(name.trim(), amount, unit);
                if let Some(category) = category {
                    item = item.with_category(parse_shopping_category(category)?);
                }

                println!("Added to shopping list: {}", item);
                library.shopping_mut().add_item(item);
                Ok(())
            }

            ShoppingSubcommand::AddRecipe { recipe } => {
                let recipe = find_recipe(library, recipe)?;
                let (id, name, count) = (recipe.id, recipe.name.clone(), recipe.ingredients.len());

                library.add_recipe_to_shopping_list(id)?;
                println!("Added {} ingredient(s) from '{}'", count, name);
                Ok(())
            }

            ShoppingSubcommand::Toggle { item } => {
                let id = find_item(library, item)?.id;
                library.shopping_mut().toggle_item(id);

                if let Some(updated) = library.shopping().get(id) {
                    println!("{}", updated);
                }
                Ok(())
            }

            ShoppingSubcommand::Update { item, amount, unit } => {
                if amount.is_none() && unit.is_none() {
                    return Err("Nothing to update. Provide --amount or --unit.".into());
                }

                let existing = find_item(library, item)?;
                let id = existing.id;
                let amount = match amount {
                    Some(amount) => check_amount(*amount)?,
                    None => existing.amount,
                };
                let unit = match unit {
                    Some(unit) => parse_unit(unit)?,
                    None => existing.unit,
                };

                library.shopping_mut().update_item(id, amount, unit);
                if let Some(updated) = library.shopping().get(id) {
                    println!("Updated: {}", updated);
                }
                Ok(())
            }

            ShoppingSubcommand::Remove { item } => {
                let found = find_item(library, item)?;
                let (id, name) = (found.id, found.name.clone());

                library.shopping_mut().remove_item(id);
                println!("Removed from shopping list: {}", name);
                Ok(())
            }

            ShoppingSubcommand::Complete => {
                let removed = library.shopping_mut().complete_shopping_run();
                if removed == 0 {
                    println!("No checked items to remove");
                } else {
                    println!("Shopping run complete: removed {} item(s)", removed);
                }
                Ok(())
            }

            ShoppingSubcommand::Clear { force } => {
                if library.shopping().items().is_empty() {
                    println!("Shopping list is already empty");
                    return Ok(());
                }

                if !force {
                    print!("Remove all items from the shopping list? [y/N] ");
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Clear cancelled.");
                        return Ok(());
                    }
                }

                library.shopping_mut().clear_all();
                println!("Shopping list cleared");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealmate_core::Unit;
    use tempfile::TempDir;

    #[test]
    fn test_find_item_by_name_or_id() {
        let temp = TempDir::new().unwrap();
        let mut library = Library::open(temp.path(), None, None);
        let item = ShoppingItem::new("Oat Milk", 2.0, Unit::Liter);
        library.shopping_mut().add_item(item.clone());

        assert_eq!(find_item(&library, "oat milk").unwrap().id, item.id);
        assert_eq!(find_item(&library, &item.id.to_string()).unwrap().id, item.id);
        assert!(find_item(&library, "Bread").is_err());
    }

    #[test]
    fn test_check_amount() {
        assert_eq!(check_amount(0.5).unwrap(), 0.5);
        assert!(check_amount(0.0).is_err());
        assert!(check_amount(f64::NAN).is_err());
    }
}

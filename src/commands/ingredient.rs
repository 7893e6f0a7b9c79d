use clap::{Args, Subcommand};

use mealmate_core::{normalize_name, Library, Unit};

use super::{parse_unit, CommandResult, OutputFormat};

#[derive(Args)]
pub struct IngredientCommand {
    #[command(subcommand)]
    pub command: IngredientSubcommand,
}

#[derive(Subcommand)]
pub enum IngredientSubcommand {
    /// List known ingredients with their default units
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add an ingredient name
    Add {
        /// Ingredient name
        name: String,

        /// Default unit
        #[arg(long, short, default_value = "pc")]
        unit: String,
    },

    /// Rename an ingredient or change its default unit
    Rename {
        /// Current name
        old_name: String,

        /// New name
        new_name: String,

        /// Default unit; keeps the current one when omitted
        #[arg(long, short)]
        unit: Option<String>,
    },

    /// Delete an ingredient name
    Delete {
        /// Ingredient name
        name: String,
    },
}

impl IngredientCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        match &self.command {
            IngredientSubcommand::List { format } => {
                let ingredients = library.ingredients();
                let rows: Vec<(&str, Unit)> = ingredients
                    .names()
                    .map(|name| (name, ingredients.default_unit(name).unwrap_or_default()))
                    .collect();

                if rows.is_empty() {
                    println!("No ingredients found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        let output: Vec<_> = rows
                            .iter()
                            .map(|(name, unit)| serde_json::json!({ "name": name, "unit": unit }))
                            .collect();
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<30}  UNIT", "NAME");
                        println!("{}", "-".repeat(40));
                        for (name, unit) in &rows {
                            println!("{:<30}  {}", name, unit.symbol());
                        }
                        println!("\nTotal: {} ingredient(s)", rows.len());
                    }
                }
                Ok(())
            }

            IngredientSubcommand::Add { name, unit } => {
                if name.trim().is_empty() {
                    return Err("Ingredient name cannot be empty".into());
                }
                let unit = parse_unit(unit)?;

                if library.ingredients_mut().add(name, unit) {
                    println!("Added ingredient: {} ({})", normalize_name(name), unit);
                } else {
                    println!("Ingredient already exists: {}", normalize_name(name));
                }
                Ok(())
            }

            IngredientSubcommand::Rename {
                old_name,
                new_name,
                unit,
            } => {
                if new_name.trim().is_empty() {
                    return Err("Ingredient name cannot be empty".into());
                }
                let ingredients = library.ingredients();
                if !ingredients.contains(old_name) {
                    return Err(format!("Ingredient not found: {}", old_name).into());
                }
                let unit = match unit {
                    Some(unit) => parse_unit(unit)?,
                    None => ingredients.default_unit(old_name).unwrap_or_default(),
                };

                if library.ingredients_mut().update(old_name, new_name, unit) {
                    println!(
                        "Renamed ingredient: {} -> {}",
                        normalize_name(old_name),
                        normalize_name(new_name)
                    );
                    Ok(())
                } else {
                    Err(format!("An ingredient named '{}' already exists", normalize_name(new_name)).into())
                }
            }

            IngredientSubcommand::Delete { name } => {
                if library.ingredients_mut().delete(name) {
                    println!("Deleted ingredient: {}", normalize_name(name));
                    Ok(())
                } else {
                    Err(format!("Ingredient not found: {}", name).into())
                }
            }
        }
    }
}

use clap::Args;

use mealmate_core::{pick_random, Library};

use super::{parse_category, CommandResult, OutputFormat};

/// Suggest random recipes
#[derive(Args)]
pub struct RandomCommand {
    /// Category to pick from (can be repeated; all categories when omitted)
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<String>,

    /// How many recipes to pick
    #[arg(long, short = 'n', default_value_t = 1)]
    count: usize,

    /// Put the picked recipes' ingredients on the shopping list
    #[arg(long)]
    add_to_shopping: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl RandomCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        if self.count == 0 {
            return Err("Count must be at least 1".into());
        }
        let categories = self
            .categories
            .iter()
            .map(|c| parse_category(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rng = rand::rng();
        let picked = pick_random(library.recipes().recipes(), &categories, self.count, &mut rng);
        if picked.is_empty() {
            println!("No recipes match the selected categories");
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&picked)?);
            }
            OutputFormat::Text => {
                for recipe in &picked {
                    println!("{}", recipe);
                }
                if picked.len() < self.count {
                    println!("Only {} recipe(s) available", picked.len());
                }
            }
        }

        if self.add_to_shopping {
            let ids: Vec<_> = picked.iter().map(|r| r.id).collect();
            for id in ids {
                library.add_recipe_to_shopping_list(id)?;
            }
            println!("Added ingredients to the shopping list");
        }
        Ok(())
    }
}

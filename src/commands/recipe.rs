use clap::{Args, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mealmate_core::{ImageData, Library, Recipe, RecipeFilter};

use super::{
    find_recipe, parse_category, parse_ingredient, parse_step_arg, truncate, CommandResult,
    OutputFormat,
};

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    /// Create a new recipe
    Add {
        /// Name of the recipe
        name: String,

        /// Short description
        #[arg(long)]
        description: Option<String>,

        /// Cook time in minutes
        #[arg(long, default_value_t = 30)]
        cook_time: u32,

        /// Number of servings
        #[arg(long, default_value_t = 2)]
        servings: u32,

        /// Category (Breakfast, Lunch, Dinner, Dessert, Snack, Drink)
        #[arg(long)]
        category: Option<String>,

        /// Ingredient, e.g. "200 g Flour" (can be repeated)
        #[arg(long = "ingredient", value_name = "INGREDIENT", required = true)]
        ingredients: Vec<String>,

        /// Instruction step, in order (can be repeated)
        #[arg(long = "step", value_name = "TEXT", required = true)]
        steps: Vec<String>,

        /// Kitchenware needed (can be repeated)
        #[arg(long = "kitchenware", value_name = "ITEM")]
        kitchenware: Vec<String>,

        /// Ingredient used in a step, as STEP=INGREDIENT (can be repeated)
        #[arg(long = "step-ingredient", value_name = "STEP=INGREDIENT")]
        step_ingredients: Vec<String>,

        /// Photo file for a step, as STEP=PATH (can be repeated)
        #[arg(long = "step-photo", value_name = "STEP=PATH")]
        step_photos: Vec<String>,

        /// Cover photo file
        #[arg(long)]
        image: Option<PathBuf>,

        /// Mark as favorite
        #[arg(long)]
        favorite: bool,
    },

    /// List recipes
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only recipes in this category
        #[arg(long)]
        category: Option<String>,

        /// Only favorites
        #[arg(long)]
        favorites: bool,

        /// Text to look for in name or description
        #[arg(long, short)]
        search: Option<String>,
    },

    /// Show a recipe's details
    Show {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update an existing recipe
    Update {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Cook time in minutes
        #[arg(long)]
        cook_time: Option<u32>,

        /// Number of servings
        #[arg(long)]
        servings: Option<u32>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// Add an ingredient (can be repeated)
        #[arg(long = "add-ingredient", value_name = "INGREDIENT")]
        add_ingredients: Vec<String>,

        /// Remove ingredients by name (can be repeated)
        #[arg(long = "remove-ingredient", value_name = "NAME")]
        remove_ingredients: Vec<String>,

        /// Append an instruction step (can be repeated)
        #[arg(long = "add-step", value_name = "TEXT")]
        add_steps: Vec<String>,

        /// Add kitchenware (can be repeated)
        #[arg(long = "add-kitchenware", value_name = "ITEM")]
        add_kitchenware: Vec<String>,

        /// Remove kitchenware (can be repeated)
        #[arg(long = "remove-kitchenware", value_name = "ITEM")]
        remove_kitchenware: Vec<String>,

        /// Replace the cover photo
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Delete a recipe
    Delete {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Toggle a recipe's favorite flag
    Favorite {
        /// Recipe ID (UUID) or name
        identifier: String,
    },

    /// Export a recipe as a .mealmate file
    Export {
        /// Recipe ID (UUID) or name
        identifier: String,

        /// Directory to write the file into
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },
}

fn read_image(path: &Path) -> Result<ImageData, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)
        .map_err(|e| format!("Failed to read image '{}': {}", path.display(), e))?;
    Ok(ImageData::new(bytes))
}

impl RecipeCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        match &self.command {
            RecipeSubcommand::Add {
                name,
                description,
                cook_time,
                servings,
                category,
                ingredients,
                steps,
                kitchenware,
                step_ingredients,
                step_photos,
                image,
                favorite,
            } => {
                if name.trim().is_empty() {
                    return Err("Recipe name cannot be empty".into());
                }

                let ingredients = ingredients
                    .iter()
                    .map(|s| parse_ingredient(s))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut recipe = Recipe::new(name.trim(), *cook_time, *servings)
                    .with_ingredients(ingredients)
                    .with_instructions(steps.clone())
                    .with_kitchenware(kitchenware.clone());

                if let Some(description) = description {
                    recipe = recipe.with_description(description.trim());
                }
                if let Some(category) = category {
                    recipe = recipe.with_category(parse_category(category)?);
                }
                if let Some(image) = image {
                    recipe = recipe.with_image(read_image(image)?);
                }
                for arg in step_ingredients {
                    let (step, text) = parse_step_arg(arg)?;
                    recipe
                        .step_ingredients
                        .entry(step)
                        .or_default()
                        .push(parse_ingredient(text)?);
                }
                for arg in step_photos {
                    let (step, path) = parse_step_arg(arg)?;
                    recipe = recipe.with_step_photo(step, read_image(Path::new(path))?);
                }
                recipe.is_favorite = *favorite;

                library.recipes_mut().add(recipe.clone())?;
                println!("Created recipe:");
                println!("{}", recipe);
                Ok(())
            }

            RecipeSubcommand::List {
                format,
                category,
                favorites,
                search,
            } => {
                let mut filter = RecipeFilter::new();
                if let Some(category) = category {
                    filter = filter.category(parse_category(category)?);
                }
                if *favorites {
                    filter = filter.favorites_only();
                }
                if let Some(search) = search {
                    filter = filter.search(search);
                }

                let recipes = filter.apply(library.recipes().recipes());
                if recipes.is_empty() {
                    println!("No recipes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&recipes)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  {:<10}  TIME", "ID", "NAME", "CATEGORY");
                        println!("{}", "-".repeat(90));
                        for recipe in &recipes {
                            let star = if recipe.is_favorite { " ★" } else { "" };
                            println!(
                                "{:<36}  {:<30}  {:<10}  {} min{}",
                                recipe.id,
                                truncate(&recipe.name, 30),
                                recipe.category.to_string(),
                                recipe.cook_time,
                                star
                            );
                        }
                        println!("\nTotal: {} recipe(s)", recipes.len());
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Show { identifier, format } => {
                let recipe = find_recipe(library, identifier)?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(recipe)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", recipe);
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Update {
                identifier,
                name,
                description,
                cook_time,
                servings,
                category,
                add_ingredients,
                remove_ingredients,
                add_steps,
                add_kitchenware,
                remove_kitchenware,
                image,
            } => {
                let has_updates = name.is_some()
                    || description.is_some()
                    || cook_time.is_some()
                    || servings.is_some()
                    || category.is_some()
                    || !add_ingredients.is_empty()
                    || !remove_ingredients.is_empty()
                    || !add_steps.is_empty()
                    || !add_kitchenware.is_empty()
                    || !remove_kitchenware.is_empty()
                    || image.is_some();

                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut recipe = find_recipe(library, identifier)?.clone();

                if let Some(new_name) = name {
                    if new_name.trim().is_empty() {
                        return Err("Recipe name cannot be empty".into());
                    }
                    recipe.name = new_name.trim().to_string();
                }
                if let Some(new_description) = description {
                    recipe.description = new_description.trim().to_string();
                }
                if let Some(new_cook_time) = cook_time {
                    recipe.cook_time = *new_cook_time;
                }
                if let Some(new_servings) = servings {
                    recipe.servings = *new_servings;
                }
                if let Some(new_category) = category {
                    recipe.category = parse_category(new_category)?;
                }
                if let Some(path) = image {
                    recipe.image_data = Some(read_image(path)?);
                }

                for removed in remove_ingredients {
                    let removed = removed.trim().to_lowercase();
                    recipe
                        .ingredients
                        .retain(|i| i.name.to_lowercase() != removed);
                }
                for added in add_ingredients {
                    recipe.ingredients.push(parse_ingredient(added)?);
                }
                recipe.instructions.extend(add_steps.iter().cloned());

                for removed in remove_kitchenware {
                    recipe
                        .kitchenware
                        .retain(|k| !k.eq_ignore_ascii_case(removed.trim()));
                }
                for added in add_kitchenware {
                    if !recipe
                        .kitchenware
                        .iter()
                        .any(|k| k.eq_ignore_ascii_case(added.trim()))
                    {
                        recipe.kitchenware.push(added.trim().to_string());
                    }
                }

                library.recipes_mut().update(recipe.clone())?;
                println!("Updated recipe:");
                println!("{}", recipe);
                Ok(())
            }

            RecipeSubcommand::Delete { identifier, force } => {
                let recipe = find_recipe(library, identifier)?;
                let (id, name) = (recipe.id, recipe.name.clone());

                // Confirm deletion unless --force is used
                if !force {
                    print!("Delete recipe '{}'? [y/N] ", name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                library.delete_recipe(id);
                println!("Deleted recipe: {}", name);
                Ok(())
            }

            RecipeSubcommand::Favorite { identifier } => {
                let recipe = find_recipe(library, identifier)?;
                let (id, name) = (recipe.id, recipe.name.clone());

                match library.recipes_mut().toggle_favorite(id) {
                    Some(true) => println!("Marked '{}' as favorite", name),
                    Some(false) => println!("Removed '{}' from favorites", name),
                    None => return Err(format!("Recipe not found: {}", identifier).into()),
                }
                Ok(())
            }

            RecipeSubcommand::Export { identifier, output } => {
                let id = find_recipe(library, identifier)?.id;
                let path = library.export_recipe(id)?.write_to(output)?;
                println!("Exported recipe to {}", path.display());
                Ok(())
            }
        }
    }
}

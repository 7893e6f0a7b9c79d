use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

use mealmate_core::{recipes_not_in_book, Library, RecipeBook};

use super::{find_book, find_recipe, parse_color, truncate, CommandResult, OutputFormat};

#[derive(Args)]
pub struct BookCommand {
    #[command(subcommand)]
    pub command: BookSubcommand,
}

#[derive(Subcommand)]
pub enum BookSubcommand {
    /// Create a new recipe book
    Create {
        /// Name of the book
        name: String,

        /// Short description
        #[arg(long)]
        description: Option<String>,

        /// Cover color (Red, Orange, Yellow, Green, Blue, Purple, Pink)
        #[arg(long)]
        color: Option<String>,

        /// Recipe ID or name to include (can be repeated)
        #[arg(long = "recipe", value_name = "RECIPE")]
        recipes: Vec<String>,
    },

    /// List recipe books
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a book and its recipes
    Show {
        /// Book ID (UUID) or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// List the recipes that could still be added
        #[arg(long)]
        available: bool,
    },

    /// Rename a book or change its description or color
    Update {
        /// Book ID (UUID) or name
        identifier: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New cover color
        #[arg(long)]
        color: Option<String>,
    },

    /// Add a recipe to a book
    AddRecipe {
        /// Book ID (UUID) or name
        book: String,

        /// Recipe ID (UUID) or name
        recipe: String,
    },

    /// Remove a recipe from a book
    RemoveRecipe {
        /// Book ID (UUID) or name
        book: String,

        /// Recipe ID (UUID) or name
        recipe: String,
    },

    /// Delete a recipe book (its recipes are kept)
    Delete {
        /// Book ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Export a book with its recipes as a .mealmatebook file
    Export {
        /// Book ID (UUID) or name
        identifier: String,

        /// Directory to write the file into
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },

    /// Save the recipes of an imported book into your collection
    SaveAll {
        /// Book ID (UUID) or name
        identifier: String,
    },
}

impl BookCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        match &self.command {
            BookSubcommand::Create {
                name,
                description,
                color,
                recipes,
            } => {
                if name.trim().is_empty() {
                    return Err("Book name cannot be empty".into());
                }

                let ids = recipes
                    .iter()
                    .map(|identifier| find_recipe(library, identifier).map(|r| r.id))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut book = RecipeBook::new(name.trim()).with_recipe_ids(ids);
                if let Some(description) = description {
                    book = book.with_description(description.trim());
                }
                if let Some(color) = color {
                    book = book.with_color(parse_color(color)?);
                }

                library.books_mut().add_book(book.clone());
                println!("Created recipe book: {} ({})", book.name, book.id);
                Ok(())
            }

            BookSubcommand::List { format } => {
                let books = library.books().books();
                if books.is_empty() {
                    println!("No recipe books found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(books)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  {:<8}  RECIPES", "ID", "NAME", "COLOR");
                        println!("{}", "-".repeat(88));
                        for book in books {
                            let imported = if book.is_snapshot() { " (imported)" } else { "" };
                            println!(
                                "{:<36}  {:<30}  {:<8}  {}{}",
                                book.id,
                                truncate(&book.name, 30),
                                book.color.to_string(),
                                book.recipe_count(),
                                imported
                            );
                        }
                        println!("\nTotal: {} book(s)", books.len());
                    }
                }
                Ok(())
            }

            BookSubcommand::Show {
                identifier,
                format,
                available,
            } => {
                let book = find_book(library, identifier)?;
                let recipes = library.book_recipes(book.id)?;

                if let OutputFormat::Json = format {
                    println!("{}", serde_json::to_string_pretty(book)?);
                    return Ok(());
                }

                println!("{}", book.name);
                println!("{}", "=".repeat(book.name.chars().count()));
                println!("Color: {}", book.color);
                if !book.description.is_empty() {
                    println!("\n{}", book.description);
                }

                println!();
                if recipes.is_empty() {
                    println!("No recipes in this book");
                } else {
                    println!("Recipes:");
                    for recipe in &recipes {
                        println!("  - {} ({}, {} min)", recipe.name, recipe.category, recipe.cook_time);
                    }
                }

                if library.has_unsaved_recipes(book.id) {
                    println!(
                        "\nThis book has recipes that aren't in your collection. \
                         Run 'mealmate book save-all \"{}\"' to keep them.",
                        book.name
                    );
                }

                if *available {
                    let candidates = recipes_not_in_book(book, library.recipes().recipes());
                    println!("\nAvailable to add:");
                    if candidates.is_empty() {
                        println!("  (none)");
                    }
                    for recipe in candidates {
                        println!("  - {}", recipe.name);
                    }
                }
                Ok(())
            }

            BookSubcommand::Update {
                identifier,
                name,
                description,
                color,
            } => {
                if name.is_none() && description.is_none() && color.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut book = find_book(library, identifier)?.clone();
                if let Some(new_name) = name {
                    if new_name.trim().is_empty() {
                        return Err("Book name cannot be empty".into());
                    }
                    book.name = new_name.trim().to_string();
                }
                if let Some(new_description) = description {
                    book.description = new_description.trim().to_string();
                }
                if let Some(new_color) = color {
                    book.color = parse_color(new_color)?;
                }

                library.books_mut().update_book(book.clone());
                println!("Updated recipe book: {}", book.name);
                Ok(())
            }

            BookSubcommand::AddRecipe { book, recipe } => {
                let book = find_book(library, book)?;
                let recipe = find_recipe(library, recipe)?;
                let (book_id, book_name) = (book.id, book.name.clone());
                let (recipe_id, recipe_name) = (recipe.id, recipe.name.clone());

                if library.books_mut().add_recipe_to_book(recipe_id, book_id) {
                    println!("Added '{}' to '{}'", recipe_name, book_name);
                } else {
                    println!("'{}' is already in '{}'", recipe_name, book_name);
                }
                Ok(())
            }

            BookSubcommand::RemoveRecipe { book, recipe } => {
                let book = find_book(library, book)?;
                let book_id = book.id;
                let book_name = book.name.clone();

                // The recipe may already be gone from the collection; a
                // snapshot book can still list it by its embedded copy.
                let recipe_id = match find_recipe(library, recipe) {
                    Ok(found) => found.id,
                    Err(_) => library
                        .book_recipes(book_id)?
                        .iter()
                        .find(|r| r.name.eq_ignore_ascii_case(recipe.trim()))
                        .map(|r| r.id)
                        .ok_or_else(|| format!("Recipe not found: {}", recipe))?,
                };

                if library.books_mut().remove_recipe_from_book(recipe_id, book_id) {
                    println!("Removed recipe from '{}'", book_name);
                } else {
                    println!("Recipe is not in '{}'", book_name);
                }
                Ok(())
            }

            BookSubcommand::Delete { identifier, force } => {
                let book = find_book(library, identifier)?;
                let (id, name) = (book.id, book.name.clone());

                if !force {
                    print!("Delete recipe book '{}'? [y/N] ", name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                library.books_mut().delete_book(id);
                println!("Deleted recipe book: {}", name);
                Ok(())
            }

            BookSubcommand::Export { identifier, output } => {
                let id = find_book(library, identifier)?.id;
                let path = library.export_book(id)?.write_to(output)?;
                println!("Exported recipe book to {}", path.display());
                Ok(())
            }

            BookSubcommand::SaveAll { identifier } => {
                let id = find_book(library, identifier)?.id;
                let saved = library.save_all_recipes(id)?;
                if saved == 0 {
                    println!("All recipes are already in your collection");
                } else {
                    println!("Saved {} recipe(s) to your collection", saved);
                }
                Ok(())
            }
        }
    }
}

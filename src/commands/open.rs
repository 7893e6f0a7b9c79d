use clap::Args;
use std::path::PathBuf;

use mealmate_core::{Imported, Library};

use super::CommandResult;

/// Import a shared .mealmate recipe or .mealmatebook file
#[derive(Args)]
pub struct OpenCommand {
    /// File to import
    file: PathBuf,

    /// Also save an imported book's recipes into your collection
    #[arg(long)]
    save_recipes: bool,
}

impl OpenCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        match library.open_file(&self.file)? {
            Imported::Recipe(recipe) => {
                println!("Imported recipe:");
                println!("{}", recipe);
            }
            Imported::Book(book) => {
                println!(
                    "Imported recipe book: {} ({} recipe(s))",
                    book.name,
                    book.recipe_count()
                );
                if self.save_recipes {
                    let saved = library.save_all_recipes(book.id)?;
                    println!("Saved {} recipe(s) to your collection", saved);
                } else if library.has_unsaved_recipes(book.id) {
                    println!(
                        "Run 'mealmate book save-all \"{}\"' to add its recipes to your collection.",
                        book.name
                    );
                }
            }
        }
        Ok(())
    }
}

use clap::{Args, Subcommand};

use mealmate_core::{normalize_name, Library};

use super::{CommandResult, OutputFormat};

#[derive(Args)]
pub struct KitchenwareCommand {
    #[command(subcommand)]
    pub command: KitchenwareSubcommand,
}

#[derive(Subcommand)]
pub enum KitchenwareSubcommand {
    /// List known kitchenware
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a kitchenware item
    Add {
        /// Item name
        name: String,
    },

    /// Rename a kitchenware item
    Rename {
        /// Current name
        old_name: String,

        /// New name
        new_name: String,
    },

    /// Delete a kitchenware item
    Delete {
        /// Item name
        name: String,
    },
}

impl KitchenwareCommand {
    pub fn run(&self, library: &mut Library) -> CommandResult {
        match &self.command {
            KitchenwareSubcommand::List { format } => {
                let items = library.kitchenware().items();
                if items.is_empty() {
                    println!("No kitchenware found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(items)?);
                    }
                    OutputFormat::Text => {
                        for item in items {
                            println!("  - {}", item);
                        }
                        println!("\nTotal: {} item(s)", items.len());
                    }
                }
                Ok(())
            }

            KitchenwareSubcommand::Add { name } => {
                if name.trim().is_empty() {
                    return Err("Kitchenware name cannot be empty".into());
                }
                if library.kitchenware_mut().add(name) {
                    println!("Added kitchenware: {}", normalize_name(name));
                } else {
                    println!("Kitchenware already exists: {}", normalize_name(name));
                }
                Ok(())
            }

            KitchenwareSubcommand::Rename { old_name, new_name } => {
                if new_name.trim().is_empty() {
                    return Err("Kitchenware name cannot be empty".into());
                }
                if !library.kitchenware().contains(old_name) {
                    return Err(format!("Kitchenware not found: {}", old_name).into());
                }
                if normalize_name(old_name) == normalize_name(new_name) {
                    println!("Nothing to rename");
                    return Ok(());
                }

                if library.kitchenware_mut().update(old_name, new_name) {
                    println!(
                        "Renamed kitchenware: {} -> {}",
                        normalize_name(old_name),
                        normalize_name(new_name)
                    );
                    Ok(())
                } else {
                    Err(format!("Kitchenware '{}' already exists", normalize_name(new_name)).into())
                }
            }

            KitchenwareSubcommand::Delete { name } => {
                if library.kitchenware_mut().delete(name) {
                    println!("Deleted kitchenware: {}", normalize_name(name));
                    Ok(())
                } else {
                    Err(format!("Kitchenware not found: {}", name).into())
                }
            }
        }
    }
}

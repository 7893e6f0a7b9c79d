use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    BookCommand, ConfigCommand, IngredientCommand, KitchenwareCommand, OpenCommand,
    RandomCommand, RecipeCommand, ShoppingCommand, WatchCommand,
};
use config::Config;
use mealmate_core::{DocumentCloud, FolderCloud, KeyValueCloud, Library};

#[derive(Parser)]
#[command(name = "mealmate")]
#[command(version)]
#[command(about = "Recipes, recipe books and a shopping list, synced through a shared folder", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage recipes
    Recipe(RecipeCommand),

    /// Manage recipe books
    Book(BookCommand),

    /// Manage the shopping list
    Shopping(ShoppingCommand),

    /// Manage saved ingredient names
    Ingredient(IngredientCommand),

    /// Manage saved kitchenware
    Kitchenware(KitchenwareCommand),

    /// Suggest random recipes
    Random(RandomCommand),

    /// Import a shared recipe or recipe book file
    Open(OpenCommand),

    /// Watch the cloud folder for changes from other devices
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealmate=warn,mealmate_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Opens the library in the configured data directory, with the cloud
/// folder attached when one is set.
fn open_library(config: &Config) -> Library {
    let cloud: Option<Arc<dyn KeyValueCloud>> = config
        .cloud_dir
        .value
        .as_ref()
        .map(|dir| Arc::new(FolderCloud::new(dir)) as Arc<dyn KeyValueCloud>);
    let documents = config.documents_dir().map(|dir| Arc::new(DocumentCloud::new(dir)));

    tracing::debug!(
        "Opening library in {} (cloud: {})",
        config.data_dir.value.display(),
        cloud.is_some()
    );
    Library::open(config.data_dir.value.clone(), cloud, documents)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Recipe(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Book(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Shopping(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Ingredient(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Kitchenware(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Random(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Open(cmd)) => cmd.run(&mut open_library(&config))?,
        Some(Commands::Watch(cmd)) => {
            let mut library = open_library(&config);
            cmd.run(&mut library, config.watch_interval.value).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, open_library)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

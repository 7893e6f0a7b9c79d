use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;

use mealmate_core::Library;

use super::{CommandResult, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show where each store loaded its data from
    Status,

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# mealmate configuration

# Directory for local recipe data (default: platform data dir + /mealmate)
# data_dir: ~/.local/share/mealmate

# Shared folder used to sync with other devices. Leave unset to stay local-only.
# cloud_dir: ~/Dropbox/MealMate

# Seconds between sync passes in `mealmate watch`
watch_interval: 5
"#;

impl ConfigCommand {
    /// `open_library` is only called for `status`.
    pub fn run(&self, config: &Config, open_library: impl FnOnce(&Config) -> Library) -> CommandResult {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        match &config.cloud_dir.value {
                            Some(dir) => println!("cloud_dir: {}", dir.display()),
                            None => println!("cloud_dir: (not set, local only)"),
                        }
                        println!("  source: {}", config.cloud_dir.source);
                        println!();

                        println!("watch_interval: {}s", config.watch_interval.value);
                        println!("  source: {}", config.watch_interval.source);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Status => {
                let library = open_library(config);
                println!("{:<15}  SOURCE", "STORE");
                println!("{}", "-".repeat(30));
                for (store, source) in library.load_sources() {
                    println!("{:<15}  {}", store.to_string(), source);
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = Config::default_config_path();

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'mealmate config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, DEFAULT_WATCH_INTERVAL};
    use tempfile::tempdir;

    #[test]
    fn test_default_template_loads() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, DEFAULT_CONFIG).unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.watch_interval.value, DEFAULT_WATCH_INTERVAL);
        assert_eq!(config.watch_interval.source, ConfigSource::File);
        assert_eq!(config.data_dir.source, ConfigSource::Default);
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local recipe files and preferences
    pub data_dir: ConfigValue<PathBuf>,
    /// Shared folder used as the cloud; local-only when unset
    pub cloud_dir: ConfigValue<Option<PathBuf>>,
    /// Seconds between sync passes in `mealmate watch`
    pub watch_interval: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    cloud_dir: Option<PathBuf>,
    watch_interval: Option<u64>,
}

pub const DEFAULT_WATCH_INTERVAL: u64 = 5;

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut cloud_dir = ConfigValue::new(None, ConfigSource::Default);
        let mut watch_interval = ConfigValue::new(DEFAULT_WATCH_INTERVAL, ConfigSource::Default);
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve(&path, dir), ConfigSource::File);
            }
            if let Some(dir) = file_config.cloud_dir {
                cloud_dir = ConfigValue::new(Some(resolve(&path, dir)), ConfigSource::File);
            }
            if let Some(seconds) = file_config.watch_interval {
                watch_interval = ConfigValue::new(seconds, ConfigSource::File);
            }

            config_file = Some(path);
        }

        if let Ok(dir) = std::env::var("MEALMATE_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("MEALMATE_CLOUD_DIR") {
            // An empty value switches the cloud off
            let dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
            cloud_dir = ConfigValue::new(dir, ConfigSource::Environment);
        }

        if watch_interval.value == 0 {
            return Err(ConfigError::InvalidValue(
                "watch_interval",
                "must be at least 1 second".to_string(),
            ));
        }

        Ok(Self {
            data_dir,
            cloud_dir,
            watch_interval,
            config_file,
        })
    }

    /// Where the shared recipe documents live inside the cloud folder.
    pub fn documents_dir(&self) -> Option<PathBuf> {
        self.cloud_dir
            .value
            .as_ref()
            .map(|dir| dir.join("Documents"))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/mealmate/
    /// - macOS: ~/Library/Application Support/mealmate/
    /// - Windows: %APPDATA%/mealmate/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mealmate")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/mealmate/
    /// - macOS: ~/Library/Application Support/mealmate/
    /// - Windows: %APPDATA%/mealmate/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mealmate")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Relative paths in the config file are relative to the file itself.
fn resolve(config_path: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_relative() {
        config_path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
    } else {
        dir
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, reason) => {
                write!(f, "Invalid config value for '{}': {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.data_dir.value.ends_with("mealmate"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.cloud_dir.value, None);
        assert_eq!(config.watch_interval.value, DEFAULT_WATCH_INTERVAL);
        assert!(config.config_file.is_none());
        assert!(config.documents_dir().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/data").unwrap();
        writeln!(file, "cloud_dir: /mnt/shared/mealmate").unwrap();
        writeln!(file, "watch_interval: 30").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/data"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(
            config.cloud_dir.value,
            Some(PathBuf::from("/mnt/shared/mealmate"))
        );
        assert_eq!(config.watch_interval.value, 30);
        assert_eq!(
            config.documents_dir(),
            Some(PathBuf::from("/mnt/shared/mealmate/Documents"))
        );
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: data\ncloud_dir: ../shared\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
        assert_eq!(
            config.cloud_dir.value,
            Some(temp_dir.path().join("../shared"))
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: /from/file\ncloud_dir: /cloud\n").unwrap();

        std::env::set_var("MEALMATE_DATA_DIR", "/from/env");
        std::env::set_var("MEALMATE_CLOUD_DIR", "");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/from/env"));
        assert_eq!(config.data_dir.source, ConfigSource::Environment);
        assert_eq!(config.cloud_dir.value, None);
        assert_eq!(config.cloud_dir.source, ConfigSource::Environment);

        std::env::remove_var("MEALMATE_DATA_DIR");
        std::env::remove_var("MEALMATE_CLOUD_DIR");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_zero_watch_interval_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "watch_interval: 0\n").unwrap();

        let err = Config::load(Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("watch_interval"));
    }
}

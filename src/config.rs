/*!
 * Configuration support for the medcodes library
 *
 * Provides runtime configuration for the import pipeline and the store
 * connection bundle. Nothing here is hard-coded at call sites: settings
 * come from a TOML file, environment variables, or built-in defaults.
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Global configuration for the import pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory searched for CMS release files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether to show progress bars during long operations
    #[serde(default = "default_enable_progress_bar")]
    pub enable_progress_bar: bool,

    /// Store connection bundle
    #[serde(default)]
    pub store: StoreConfig,
}

/// Connection bundle for the target store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub database: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_password")]
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            enable_progress_bar: default_enable_progress_bar(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            database: default_db_name(),
            user: default_db_user(),
            password: default_db_password(),
        }
    }
}

// Default value functions for serde
fn default_data_dir() -> PathBuf {
    PathBuf::from("/opt/data")
}

fn default_enable_progress_bar() -> bool {
    true
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "claims_db".to_string()
}

fn default_db_user() -> String {
    "claims_user".to_string()
}

fn default_db_password() -> String {
    "claims_password".to_string()
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - `MEDCODES_DATA_DIR`: directory path
    /// - `MEDCODES_PROGRESS_BAR`: "true" or "false"
    /// - `MEDCODES_DB_HOST`, `MEDCODES_DB_PORT`, `MEDCODES_DB_NAME`,
    ///   `MEDCODES_DB_USER`, `MEDCODES_DB_PASSWORD`: store connection bundle
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MEDCODES_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("MEDCODES_PROGRESS_BAR") {
            config.enable_progress_bar = val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("MEDCODES_DB_HOST") {
            config.store.host = val;
        }

        if let Ok(val) = std::env::var("MEDCODES_DB_PORT") {
            if let Ok(port) = val.parse() {
                config.store.port = port;
            }
        }

        if let Ok(val) = std::env::var("MEDCODES_DB_NAME") {
            config.store.database = val;
        }

        if let Ok(val) = std::env::var("MEDCODES_DB_USER") {
            config.store.user = val;
        }

        if let Ok(val) = std::env::var("MEDCODES_DB_PASSWORD") {
            config.store.password = val;
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| crate::MedCodesError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                suggestion: Some("Check that the file is valid TOML format".to_string()),
            })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::MedCodesError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                suggestion: None,
            })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/medcodes/config.toml` on Unix-like systems
    /// or `%APPDATA%\medcodes\config.toml` on Windows
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "medcodes")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default location, environment, or defaults
    ///
    /// Priority order:
    /// 1. Default config file (if exists)
    /// 2. Environment variables
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::from_file(&config_path) {
                    return config;
                }
            }
        }

        Self::from_env()
    }
}

// Global configuration support
use std::sync::RwLock;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<Option<Config>> = RwLock::new(None);
}

/// Set the global configuration
pub fn set_global_config(config: Config) {
    *GLOBAL_CONFIG.write().unwrap() = Some(config);
}

/// Get the global configuration (or default if not set)
pub fn global_config() -> Config {
    GLOBAL_CONFIG.read().unwrap()
        .as_ref()
        .cloned()
        .unwrap_or_else(Config::load)
}

/// Clear the global configuration
pub fn clear_global_config() {
    *GLOBAL_CONFIG.write().unwrap() = None;
}

/// Builder for customizing configuration
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the data directory
    pub fn data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set progress bar enabled
    pub fn progress_bar(mut self, enabled: bool) -> Self {
        self.config.enable_progress_bar = enabled;
        self
    }

    /// Set the store host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.store.host = host.into();
        self
    }

    /// Set the store port
    pub fn port(mut self, port: u16) -> Self {
        self.config.store.port = port;
        self
    }

    /// Set the store database name
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.store.database = database.into();
        self
    }

    /// Set the store user
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.store.user = user.into();
        self
    }

    /// Set the store password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.store.password = password.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.enable_progress_bar);
        assert_eq!(config.data_dir, PathBuf::from("/opt/data"));
        assert_eq!(config.store.host, "localhost");
        assert_eq!(config.store.port, 5432);
        assert_eq!(config.store.database, "claims_db");
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .data_dir("/srv/releases")
            .progress_bar(false)
            .host("db.internal")
            .port(5433)
            .database("claims")
            .build();

        assert!(!config.enable_progress_bar);
        assert_eq!(config.data_dir, PathBuf::from("/srv/releases"));
        assert_eq!(config.store.host, "db.internal");
        assert_eq!(config.store.port, 5433);
        assert_eq!(config.store.database, "claims");
    }

    #[test]
    fn test_config_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ConfigBuilder::new().host("db.internal").port(5433).build();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.store.host, "db.internal");
        assert_eq!(loaded.store.port, 5433);
    }
}

//! Configuration management with file persistence

use crate::security::{ADMIN_CODE_ENV, AdminSecret, DEFAULT_MAX_ATTEMPTS, SecretOrigin};
use crate::storage::{DatabaseConfig, default_database_path};
use crate::storage::database::DEFAULT_MAX_CONNECTIONS;
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "ATHENAEUM_CONFIG_DIR";

/// Environment variable overriding the database file
pub const DATABASE_ENV: &str = "ATHENAEUM_DATABASE";

/// Athenaeum configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub access: AccessSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file; the platform data directory is used when unset
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub max_attempts: u32,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

const KEYS: [&str; 4] = [
    "database.path",
    "database.max_connections",
    "access.max_attempts",
    "access.admin_code",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("athenaeum")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections < 1 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        if !(1..=10).contains(&self.access.max_attempts) {
            return Err(anyhow!("access.max_attempts must be between 1 and 10"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(match &self.database.path {
                Some(path) => path.display().to_string(),
                None => format!("(default: {})", default_database_path().display()),
            }),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),
            "access.max_attempts" => Ok(self.access.max_attempts.to_string()),

            // Never shown; only where it comes from
            "access.admin_code" => Ok(match AdminSecret::from_env().origin() {
                SecretOrigin::Environment => format!("(set via {})", ADMIN_CODE_ENV),
                SecretOrigin::InsecureFallback => {
                    format!("(not set - insecure fallback in use; set {})", ADMIN_CODE_ENV)
                }
            }),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `athenaeum config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                let value = value.trim();
                self.database.path = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            "database.max_connections" => {
                let max: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
                if max < 1 {
                    return Err(anyhow!("database.max_connections must be at least 1"));
                }
                self.database.max_connections = max;
            }
            "access.max_attempts" => {
                let attempts: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_attempts value: {}", value))?;
                if !(1..=10).contains(&attempts) {
                    return Err(anyhow!("access.max_attempts must be between 1 and 10"));
                }
                self.access.max_attempts = attempts;
            }

            "access.admin_code" => {
                return Err(anyhow!(
                    "The admin code cannot be stored in configuration. \
                     Set the {} environment variable instead.",
                    ADMIN_CODE_ENV
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `athenaeum config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.into_iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }

    /// Database file to open. An explicit path wins, then
    /// `ATHENAEUM_DATABASE`, then the configured path, then the default.
    pub fn database_path(&self, explicit: Option<&Path>) -> PathBuf {
        self.database_path_with(explicit, env::var_os(DATABASE_ENV).map(PathBuf::from))
    }

    fn database_path_with(&self, explicit: Option<&Path>, from_env: Option<PathBuf>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or(from_env.filter(|p| !p.as_os_str().is_empty()))
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(default_database_path)
    }

    /// Store settings for the resolved database file
    pub fn database_config(&self, explicit: Option<&Path>) -> DatabaseConfig {
        DatabaseConfig::with_path(self.database_path(explicit))
            .max_connections(self.database.max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.access.max_attempts, 3);
        assert_eq!(config.database.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_set_validates_ranges() {
        let mut config = Config::default();
        config.set("access.max_attempts", "5").unwrap();
        assert_eq!(config.get("access.max_attempts").unwrap(), "5");

        assert!(config.set("access.max_attempts", "0").is_err());
        assert!(config.set("access.max_attempts", "11").is_err());
        assert!(config.set("database.max_connections", "0").is_err());
        assert!(config.set("database.max_connections", "many").is_err());
        assert!(config.set("access.admin_code", "letmein").is_err());
        assert!(config.set("nonsense", "1").is_err());
    }

    #[test]
    fn test_list_covers_every_key() {
        let listed = Config::default().list().unwrap();
        let keys: Vec<_> = listed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, KEYS);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("database.path", "/srv/library.db").unwrap();
        config.set("access.max_attempts", "4").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.database.path, Some(PathBuf::from("/srv/library.db")));
        assert_eq!(loaded.access.max_attempts, 4);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[access]\nmax_attempts = 2\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.access.max_attempts, 2);
        assert_eq!(loaded.database.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[access]\nmax_attempts = 50\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_database_path_precedence() {
        let mut config = Config::default();
        config.database.path = Some(PathBuf::from("configured.db"));

        let explicit = Path::new("flag.db");
        assert_eq!(
            config.database_path_with(Some(explicit), Some(PathBuf::from("env.db"))),
            PathBuf::from("flag.db")
        );
        assert_eq!(
            config.database_path_with(None, Some(PathBuf::from("env.db"))),
            PathBuf::from("env.db")
        );
        assert_eq!(config.database_path_with(None, None), PathBuf::from("configured.db"));

        config.database.path = None;
        assert_eq!(config.database_path_with(None, None), default_database_path());
    }
}

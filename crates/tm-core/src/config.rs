//! Configuration types and parsing for tidemark.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names looked up in the project directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["tidemark.yml", "tidemark.yaml"];

/// Project configuration from tidemark.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory containing migration scripts. When unset the CLI searches
    /// a fixed list of candidate locations.
    #[serde(default)]
    pub migrations_dir: Option<String>,

    /// Operation budget for a single command, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// PostgreSQL
    Postgres,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
            DbType::Postgres => write!(f, "postgres"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type (duckdb or postgres)
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (for DuckDB file-based or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Connection URL (PostgreSQL only)
    #[serde(default)]
    pub url: Option<String>,

    /// Connection pool size (PostgreSQL only)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_dir: None,
            timeout_secs: default_timeout_secs(),
            database: DatabaseConfig::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find the config file in a directory, if there is one.
    pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load configuration from a project directory.
    ///
    /// A missing config file is not an error; defaults are used instead.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match Self::find_in_dir(dir) {
            Some(path) => Self::load(&path),
            None => {
                log::debug!(
                    "No {} in {}, using defaults",
                    CONFIG_FILE_NAMES[0],
                    dir.display()
                );
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if self.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "timeout_secs must be greater than zero".to_string(),
            });
        }

        if let Some(dir) = &self.migrations_dir {
            if dir.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "migrations_dir cannot be empty".to_string(),
                });
            }
        }

        match self.database.db_type {
            DbType::DuckDb => {
                if self.database.path.is_empty() {
                    return Err(CoreError::ConfigInvalid {
                        message: "database.path cannot be empty for duckdb".to_string(),
                    });
                }
            }
            DbType::Postgres => {
                if self.database.url.as_deref().map_or(true, str::is_empty) {
                    return Err(CoreError::ConfigInvalid {
                        message: "database.url is required for postgres".to_string(),
                    });
                }
                if self.database.max_connections == 0 {
                    return Err(CoreError::ConfigInvalid {
                        message: "database.max_connections must be greater than zero"
                            .to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

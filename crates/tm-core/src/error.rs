//! Error types for tm-core

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Migrations directory could not be listed
    #[error("[C001] Migrations directory unavailable: {path}: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// C002: A migration file matched the naming rule but could not be read
    #[error("[C002] Failed to read migration script {path}: {source}")]
    ScriptUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// C003: Two migrations share a version number
    #[error("[C003] Duplicate migration version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: i64,
        first: String,
        second: String,
    },

    /// C004: Configuration file not found
    #[error("[C004] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C005: Failed to parse configuration file
    #[error("[C005] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C006: Invalid configuration value
    #[error("[C006] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C007: Invalid name for a new migration
    #[error("[C007] Invalid migration name '{name}': {reason}")]
    InvalidMigrationName { name: String, reason: String },

    /// C008: IO error with file path context
    #[error("[C008] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_yaml::Error> for CoreError {
    fn from(err: serde_yaml::Error) -> Self {
        CoreError::ConfigParseError {
            message: err.to_string(),
        }
    }
}

//! Migration records and the `<version>_<name>.sql` file naming rule.

use crate::error::{CoreError, CoreResult};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// File extension recognized as a migration script.
pub const SCRIPT_EXTENSION: &str = "sql";

/// A single versioned schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Positive version number; migrations apply in ascending order.
    pub version: i64,

    /// Descriptive label taken from the file name.
    pub name: String,

    /// SQL text executed against the database.
    pub script: String,

    /// File the migration was loaded from, if any.
    pub path: Option<PathBuf>,
}

impl Migration {
    /// Create a migration that did not come from a file.
    pub fn new(version: i64, name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            script: script.into(),
            path: None,
        }
    }

    /// Human-readable origin used in diagnostics.
    pub fn origin(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("{:03}_{}", self.version, self.name),
        }
    }
}

/// Outcome of matching a file name against the naming rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileNameMatch {
    /// A well-formed migration file name.
    Migration { version: i64, name: String },

    /// Not a migration candidate at all (wrong extension, no separator).
    Ignored,

    /// Looks like a migration but the version or name is unusable.
    Invalid { reason: String },
}

/// Classify a file name such as `001_initial_schema.sql`.
pub fn parse_file_name(file_name: &str) -> FileNameMatch {
    let Some(stem) = file_name
        .strip_suffix(SCRIPT_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
    else {
        return FileNameMatch::Ignored;
    };

    let Some((prefix, name)) = stem.split_once('_') else {
        return FileNameMatch::Ignored;
    };

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return FileNameMatch::Invalid {
            reason: format!("version prefix '{prefix}' is not a decimal number"),
        };
    }

    let version: i64 = match prefix.parse() {
        Ok(v) => v,
        Err(_) => {
            return FileNameMatch::Invalid {
                reason: format!("version prefix '{prefix}' is out of range"),
            }
        }
    };

    if version == 0 {
        return FileNameMatch::Invalid {
            reason: "version must be greater than zero".to_string(),
        };
    }

    if name.is_empty() {
        return FileNameMatch::Invalid {
            reason: "missing descriptive name after the version".to_string(),
        };
    }

    FileNameMatch::Migration {
        version,
        name: name.to_string(),
    }
}

/// Build the file name for a new timestamp-versioned migration.
///
/// The version is the `YYYYMMDDHHMMSS` rendering of `now`, so files created
/// later sort after earlier ones.
pub fn new_migration_file_name(now: NaiveDateTime, name: &str) -> CoreResult<String> {
    validate_migration_name(name)?;
    Ok(format!(
        "{}_{}.{}",
        now.format("%Y%m%d%H%M%S"),
        name,
        SCRIPT_EXTENSION
    ))
}

fn validate_migration_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::InvalidMigrationName {
            name: name.to_string(),
            reason: "name must not be empty".to_string(),
        });
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(CoreError::InvalidMigrationName {
            name: name.to_string(),
            reason: format!("character '{bad}' is not allowed (use letters, digits, '_')"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;

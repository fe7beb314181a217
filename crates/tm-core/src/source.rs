//! Migration sources.
//!
//! A [`MigrationSource`] produces the full, version-ordered list of
//! migrations. [`DirectorySource`] reads `<version>_<name>.sql` files from a
//! directory; [`InMemorySource`] wraps a fixed list and is what tests and
//! embedders use.

use crate::error::{CoreError, CoreResult};
use crate::migration::{parse_file_name, FileNameMatch, Migration};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Anything that can produce the ordered set of known migrations.
pub trait MigrationSource: Send + Sync {
    /// Load every migration, sorted ascending by version.
    ///
    /// Must be deterministic for an unchanged underlying source.
    fn load(&self) -> CoreResult<Vec<Migration>>;

    /// Short description for status output (e.g. the directory path).
    fn describe(&self) -> String;
}

/// Migrations read from a directory of SQL files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Create a source over `dir`. The directory is not touched until
    /// [`MigrationSource::load`] is called.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MigrationSource for DirectorySource {
    fn load(&self) -> CoreResult<Vec<Migration>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| CoreError::DirectoryUnavailable {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut migrations = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::DirectoryUnavailable {
                path: self.dir.clone(),
                source: e,
            })?;
            let path = entry.path();

            // Follows symlinks; a link to a directory is still skipped.
            if path.is_dir() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                log::warn!(
                    "Skipping migration file with non UTF-8 name: {}",
                    path.display()
                );
                continue;
            };

            let (version, name) = match parse_file_name(file_name) {
                FileNameMatch::Migration { version, name } => (version, name),
                FileNameMatch::Ignored => continue,
                FileNameMatch::Invalid { reason } => {
                    log::warn!("Skipping invalid migration file {}: {}", file_name, reason);
                    continue;
                }
            };

            let script = std::fs::read_to_string(&path).map_err(|e| {
                CoreError::ScriptUnreadable {
                    path: path.clone(),
                    source: e,
                }
            })?;

            migrations.push(Migration {
                version,
                name,
                script,
                path: Some(path),
            });
        }

        log::debug!(
            "Loaded {} migration(s) from {}",
            migrations.len(),
            self.dir.display()
        );
        sort_and_validate(migrations)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// A fixed, in-memory list of migrations.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    migrations: Vec<Migration>,
}

impl InMemorySource {
    /// Wrap `migrations`; order does not matter.
    pub fn new(migrations: Vec<Migration>) -> Self {
        Self { migrations }
    }
}

impl MigrationSource for InMemorySource {
    fn load(&self) -> CoreResult<Vec<Migration>> {
        sort_and_validate(self.migrations.clone())
    }

    fn describe(&self) -> String {
        "<in-memory>".to_string()
    }
}

/// Sort by version and reject duplicate versions.
pub fn sort_and_validate(migrations: Vec<Migration>) -> CoreResult<Vec<Migration>> {
    let mut by_version: BTreeMap<i64, Migration> = BTreeMap::new();
    for migration in migrations {
        if let Some(existing) = by_version.get(&migration.version) {
            // Report the pair in a stable order regardless of listing order.
            let (mut first, mut second) = (existing.origin(), migration.origin());
            if second < first {
                std::mem::swap(&mut first, &mut second);
            }
            return Err(CoreError::DuplicateVersion {
                version: migration.version,
                first,
                second,
            });
        }
        by_version.insert(migration.version, migration);
    }
    Ok(by_version.into_values().collect())
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;

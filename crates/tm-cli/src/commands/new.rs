//! New command implementation

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tm_core::new_migration_file_name;

use crate::cli::{GlobalArgs, NewArgs};
use crate::context::RuntimeContext;

/// Execute the new command
pub(crate) async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let now = chrono::Local::now().naive_local();

    let path = create_migration_file(&ctx.migrations_dir, now, &args.name)?;
    println!("Created {}", path.display());

    Ok(())
}

/// Create an empty, timestamped migration script in `dir`.
///
/// Fails if a file with the same name already exists.
pub(crate) fn create_migration_file(dir: &Path, now: NaiveDateTime, name: &str) -> Result<PathBuf> {
    let file_name = new_migration_file_name(now, name)?;

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create migrations directory {}", dir.display()))?;

    let path = dir.join(file_name);
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(_) => Ok(path),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            anyhow::bail!("Migration file already exists: {}", path.display())
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to create migration file {}", path.display()))
        }
    }
}

#[cfg(test)]
#[path = "new_test.rs"]
mod tests;

//! Version command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, VersionArgs};
use crate::commands::common::ExitCode;
use crate::context::RuntimeContext;

/// Execute the version command
pub(crate) async fn execute(args: &VersionArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let deadline = ctx.deadline()?;
    let migrator = ctx.migrator().await?;

    let current = migrator.current_version(deadline).await;
    migrator.close().await;
    let current = current.context("Failed to read current schema version")?;

    println!("Current schema version: {}", current);

    if let Some(expected) = args.expect {
        if expected != current {
            eprintln!(
                "Schema version mismatch: expected {}, found {}",
                expected, current
            );
            return Err(ExitCode(1).into());
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;

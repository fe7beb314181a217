//! Status command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::context::RuntimeContext;

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let deadline = ctx.deadline()?;
    let migrator = ctx.migrator().await?;

    let report = migrator.status(deadline).await;
    migrator.close().await;
    let report = report.context("Failed to read migration status")?;

    match args.output {
        StatusOutput::Text => println!("{}", report),
        StatusOutput::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;

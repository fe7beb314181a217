//! Up command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::ExitCode;
use crate::context::RuntimeContext;

/// Execute the up command
pub(crate) async fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    ctx.verbose(&format!(
        "Migrations directory: {}",
        ctx.migrations_dir.display()
    ));

    let deadline = ctx.deadline()?;
    let migrator = ctx.migrator().await?;

    let outcome = match args.target {
        Some(target) => {
            ctx.verbose(&format!("Applying migrations up to version {}", target));
            migrator.run_up_to(deadline, target).await
        }
        None => migrator.run_all(deadline).await,
    };
    migrator.close().await;

    let summary = match outcome {
        Ok(summary) => summary,
        Err(err) => {
            match err.failed_version() {
                Some(version) => eprintln!("  ✗ {:03} failed: {}", version, err),
                None => eprintln!("  ✗ migration run failed: {}", err),
            }
            return Err(ExitCode(1).into());
        }
    };

    for applied in &summary.applied {
        println!(
            "  ✓ {:03} {} [{}ms]",
            applied.version, applied.name, applied.duration_ms
        );
    }

    if summary.applied.is_empty() {
        println!(
            "No pending migrations (current version {})",
            summary.current_version
        );
    } else {
        println!(
            "\nApplied {} migration(s), {} already applied, current version {}",
            summary.applied.len(),
            summary.skipped,
            summary.current_version
        );
    }

    Ok(())
}

#[cfg(test)]
#[path = "up_test.rs"]
mod tests;

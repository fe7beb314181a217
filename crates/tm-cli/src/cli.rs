//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tidemark - versioned, forward-only SQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database to migrate: a DuckDB path, ":memory:", or a postgres:// URL
    #[arg(short, long, global = true, env = "TIDEMARK_DATABASE")]
    pub database: Option<String>,

    /// Directory containing migration scripts
    #[arg(short, long, global = true, env = "TIDEMARK_MIGRATIONS_DIR")]
    pub migrations_dir: Option<PathBuf>,

    /// Operation budget in seconds (overrides timeout_secs in config)
    #[arg(long, global = true, env = "TIDEMARK_TIMEOUT")]
    pub timeout: Option<u64>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Up(UpArgs),

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Print the current schema version
    Version(VersionArgs),

    /// Create a new, empty migration file
    New(NewArgs),
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Only apply migrations up to and including this version
    #[arg(short, long)]
    pub target: Option<i64>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Human-readable report
    Text,
    /// JSON output
    Json,
}

/// Arguments for the version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Exit with code 1 unless the current version equals this value
    #[arg(long)]
    pub expect: Option<i64>,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Descriptive name (letters, digits, underscores)
    pub name: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

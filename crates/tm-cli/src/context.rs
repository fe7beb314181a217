//! Runtime context for CLI commands

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tm_core::{Config, DbType, DirectorySource};
use tm_db::{DuckDbLedger, LedgerStore};
use tm_migrate::Migrator;
use tokio::time::Instant;

use crate::cli::GlobalArgs;

/// Candidate migration directories, relative to the project directory unless
/// absolute. The first one that exists wins.
pub(crate) const MIGRATION_DIR_CANDIDATES: &[&str] = &[
    "migrations",
    "../migrations",
    "db/migrations",
    "/app/migrations",
];

/// Used when no candidate exists; loading will report it as unavailable.
pub(crate) const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Runtime context containing loaded config and resolved locations
pub struct RuntimeContext {
    /// Loaded (or default) configuration
    pub config: Config,

    /// Project directory; relative config paths resolve against it
    pub project_dir: PathBuf,

    /// Directory the migrations are read from
    pub migrations_dir: PathBuf,

    /// Database argument from the command line, if any
    database: Option<String>,

    /// Operation budget for the command
    pub timeout: Duration,

    /// Verbose output enabled
    pub verbose: bool,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let project_dir = args.project_dir.as_path();

        let config = match &args.config {
            Some(path) => Config::load(path).context("Failed to load configuration file")?,
            None => {
                Config::load_from_dir(project_dir).context("Failed to load project configuration")?
            }
        };

        let migrations_dir = resolve_migrations_dir(
            project_dir,
            args.migrations_dir.as_deref(),
            config.migrations_dir.as_deref(),
        );

        let timeout_secs = args.timeout.unwrap_or(config.timeout_secs);
        if timeout_secs == 0 {
            bail!("--timeout must be greater than zero");
        }

        Ok(Self {
            config,
            project_dir: project_dir.to_path_buf(),
            migrations_dir,
            database: args.database.clone(),
            timeout: Duration::from_secs(timeout_secs),
            verbose: args.verbose,
        })
    }

    /// Deadline for one command, starting now
    pub fn deadline(&self) -> Result<Instant> {
        match Instant::now().checked_add(self.timeout) {
            Some(deadline) => Ok(deadline),
            None => bail!("timeout of {}s is too large", self.timeout.as_secs()),
        }
    }

    /// Open the configured ledger database
    pub async fn open_store(&self) -> Result<Arc<dyn LedgerStore>> {
        let target = match &self.database {
            Some(database) => DatabaseTarget::from_arg(database),
            None => DatabaseTarget::from_config(&self.config, &self.project_dir)?,
        };
        log::debug!("Using {}", target);
        target.open(self.config.database.max_connections).await
    }

    /// Build a migrator over the resolved directory and configured database
    pub async fn migrator(&self) -> Result<Migrator> {
        let store = self.open_store().await?;
        Ok(Migrator::new(
            Box::new(DirectorySource::new(&self.migrations_dir)),
            store,
        ))
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }
}

/// Pick the migrations directory.
///
/// Precedence: explicit argument, config value, first existing candidate,
/// then [`DEFAULT_MIGRATIONS_DIR`]. Relative paths are resolved against
/// `project_dir`.
pub(crate) fn resolve_migrations_dir(
    project_dir: &Path,
    explicit: Option<&Path>,
    configured: Option<&str>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return project_dir.join(dir);
    }
    if let Some(dir) = configured {
        return project_dir.join(dir);
    }

    for candidate in MIGRATION_DIR_CANDIDATES {
        let path = project_dir.join(candidate);
        if path.is_dir() {
            log::debug!("Found migrations directory {}", path.display());
            return path;
        }
    }

    project_dir.join(DEFAULT_MIGRATIONS_DIR)
}

const IN_MEMORY: &str = ":memory:";

/// Where the ledger lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DatabaseTarget {
    DuckDb(String),
    Postgres(String),
}

impl DatabaseTarget {
    /// Interpret a `--database` value.
    pub(crate) fn from_arg(value: &str) -> Self {
        if value.starts_with("postgres://") || value.starts_with("postgresql://") {
            DatabaseTarget::Postgres(value.to_string())
        } else {
            DatabaseTarget::DuckDb(value.to_string())
        }
    }

    /// Target from the config's `database` section. A relative DuckDB path is
    /// taken relative to `project_dir`.
    pub(crate) fn from_config(config: &Config, project_dir: &Path) -> Result<Self> {
        match config.database.db_type {
            DbType::DuckDb => {
                let path = &config.database.path;
                if path == IN_MEMORY || Path::new(path).is_absolute() {
                    Ok(DatabaseTarget::DuckDb(path.clone()))
                } else {
                    Ok(DatabaseTarget::DuckDb(
                        project_dir.join(path).display().to_string(),
                    ))
                }
            }
            DbType::Postgres => match &config.database.url {
                Some(url) => Ok(DatabaseTarget::Postgres(url.clone())),
                None => bail!("database.url is required for postgres"),
            },
        }
    }

    async fn open(&self, max_connections: u32) -> Result<Arc<dyn LedgerStore>> {
        match self {
            DatabaseTarget::DuckDb(path) => {
                let store = DuckDbLedger::new(path)
                    .with_context(|| format!("Failed to open DuckDB database at {path}"))?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "postgres")]
            DatabaseTarget::Postgres(url) => {
                let store = tm_db::PostgresLedger::connect(url, max_connections)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            DatabaseTarget::Postgres(_) => {
                let _ = max_connections;
                Err(tm_db::DbError::BackendUnavailable("postgres".to_string()))
                    .context("Rebuild with `--features postgres` to migrate PostgreSQL")
            }
        }
    }
}

impl std::fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::DuckDb(path) => write!(f, "duckdb database {path}"),
            // Credentials stay out of logs.
            DatabaseTarget::Postgres(_) => write!(f, "postgres database"),
        }
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

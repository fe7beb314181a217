//! tm-migrate - Migration executor for Tidemark
//!
//! Applies pending migrations from a [`tm_core::MigrationSource`] against a
//! [`tm_db::LedgerStore`], one transaction per migration, and reports
//! applied / pending status.

pub mod error;
pub mod executor;
pub mod status;

pub use error::{MigrateError, MigrateResult};
pub use executor::{AppliedMigration, Migrator, RunSummary};
pub use status::{MigrationState, StatusEntry, StatusReport};

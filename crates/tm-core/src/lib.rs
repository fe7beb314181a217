//! tm-core - Core library for Tidemark
//!
//! This crate provides the migration record type, the file naming rule,
//! migration sources (directory-backed and in-memory), and configuration
//! parsing shared by the other Tidemark crates.

pub mod config;
pub mod error;
pub mod migration;
pub mod source;

pub use config::{Config, DatabaseConfig, DbType};
pub use error::{CoreError, CoreResult};
pub use migration::{new_migration_file_name, parse_file_name, FileNameMatch, Migration};
pub use source::{DirectorySource, InMemorySource, MigrationSource};

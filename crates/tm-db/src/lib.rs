//! tm-db - Ledger storage layer for Tidemark
//!
//! This crate provides the `LedgerStore` / `LedgerTransaction` traits that
//! record applied migrations, a DuckDB implementation, and a PostgreSQL
//! implementation behind the `postgres` feature.

pub mod duckdb;
pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use crate::duckdb::DuckDbLedger;
pub use error::{DbError, DbResult};
#[cfg(feature = "postgres")]
pub use postgres::PostgresLedger;
pub use traits::{LedgerEntry, LedgerStore, LedgerTransaction, LEDGER_TABLE};

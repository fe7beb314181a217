//! Read-only status report combining discovered migrations with the ledger.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tm_core::Migration;
use tm_db::LedgerEntry;

/// Lifecycle of a single migration: `Pending -> Applying -> Applied | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Pending,
    Applying,
    Applied,
    Failed,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationState::Pending => write!(f, "Pending"),
            MigrationState::Applying => write!(f, "Applying"),
            MigrationState::Applied => write!(f, "Applied"),
            MigrationState::Failed => write!(f, "Failed"),
        }
    }
}

/// One discovered migration and whether the ledger has it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub version: i64,
    pub name: String,
    pub state: MigrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<NaiveDateTime>,
}

/// Snapshot of migration state for `tm status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Where migrations were loaded from
    pub source: String,
    pub entries: Vec<StatusEntry>,
    /// Highest version in the ledger, 0 if empty
    pub current_version: i64,
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    /// Ledger versions with no matching migration in the source
    pub unknown_applied: Vec<i64>,
}

impl StatusReport {
    /// Cross-reference `migrations` (sorted by version) with the ledger rows.
    pub fn build(source: String, migrations: &[Migration], ledger: &[LedgerEntry]) -> Self {
        let mut by_version: BTreeMap<i64, &LedgerEntry> =
            ledger.iter().map(|e| (e.version, e)).collect();

        let entries: Vec<StatusEntry> = migrations
            .iter()
            .map(|m| {
                let ledger_entry = by_version.remove(&m.version);
                StatusEntry {
                    version: m.version,
                    name: m.name.clone(),
                    state: if ledger_entry.is_some() {
                        MigrationState::Applied
                    } else {
                        MigrationState::Pending
                    },
                    applied_at: ledger_entry.map(|e| e.applied_at),
                }
            })
            .collect();

        let applied = entries
            .iter()
            .filter(|e| e.state == MigrationState::Applied)
            .count();
        let current_version = ledger.iter().map(|e| e.version).max().unwrap_or(0);

        Self {
            source,
            total: entries.len(),
            applied,
            pending: entries.len() - applied,
            entries,
            current_version,
            unknown_applied: by_version.into_keys().collect(),
        }
    }

    /// Entries still waiting to be applied
    pub fn pending_entries(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries
            .iter()
            .filter(|e| e.state == MigrationState::Pending)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration Status:")?;
        writeln!(f, "=================")?;
        writeln!(f, "Migrations directory: {}", self.source)?;
        writeln!(f)?;

        for entry in &self.entries {
            writeln!(
                f,
                "{:03}: {:<30} [{}]",
                entry.version, entry.name, entry.state
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Current schema version: {}", self.current_version)?;
        writeln!(f, "Total migrations: {}", self.total)?;
        writeln!(f, "Applied migrations: {}", self.applied)?;
        write!(f, "Pending migrations: {}", self.pending)?;

        if !self.unknown_applied.is_empty() {
            let versions: Vec<String> =
                self.unknown_applied.iter().map(|v| v.to_string()).collect();
            write!(
                f,
                "\nApplied but not found in source: {}",
                versions.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;

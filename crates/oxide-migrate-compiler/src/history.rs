//! Migration history tracking.
//!
//! This module renders the SQL for the `migrations` table that records which
//! migrations have been applied. Two layouts exist: the current
//! `(id, version, timestamp)` one and the legacy
//! `(revision, app_version, date_migrated)` one. The SELECT aliases the legacy
//! columns so both read back into an [`AppliedMigration`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::step::{MigrationStep, QueryValue};

/// SQL to create the migrations history table.
pub const CREATE_MIGRATIONS_TABLE_SQL: &str = r#"CREATE TABLE IF NOT EXISTS "migrations" ("id" INTEGER NOT NULL PRIMARY KEY, "version" TEXT NOT NULL, "timestamp" INTEGER NOT NULL);"#;

/// SQL to create the legacy migrations history table.
pub const CREATE_LEGACY_MIGRATIONS_TABLE_SQL: &str = r#"CREATE TABLE IF NOT EXISTS "migrations" ("revision" INTEGER NOT NULL PRIMARY KEY, "app_version" TEXT NOT NULL, "date_migrated" INTEGER NOT NULL);"#;

/// Layout of the migrations history table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationTable {
    /// `(id, version, timestamp)`.
    #[default]
    Current,
    /// `(revision, app_version, date_migrated)`.
    Legacy,
}

impl MigrationTable {
    /// SQL creating the history table.
    #[must_use]
    pub fn create_table_sql(&self) -> &'static str {
        match self {
            Self::Current => CREATE_MIGRATIONS_TABLE_SQL,
            Self::Legacy => CREATE_LEGACY_MIGRATIONS_TABLE_SQL,
        }
    }

    /// SQL reading the last applied migration as `(id, version, timestamp)`.
    #[must_use]
    pub fn select_latest_sql(&self) -> &'static str {
        match self {
            Self::Current => {
                r#"SELECT MAX("id") as "id", "version", "timestamp" FROM "migrations";"#
            }
            Self::Legacy => {
                r#"SELECT MAX("revision") as "id", "app_version" AS "version", "date_migrated" AS "timestamp" FROM "migrations";"#
            }
        }
    }

    /// SQL recording an applied migration; binds `(id, version, timestamp)`.
    #[must_use]
    pub fn insert_sql(&self) -> &'static str {
        match self {
            Self::Current => {
                r#"INSERT INTO "migrations" ("id", "version", "timestamp") VALUES (?, ?, ?);"#
            }
            Self::Legacy => {
                r#"INSERT INTO "migrations" ("revision", "app_version", "date_migrated") VALUES (?, ?, ?);"#
            }
        }
    }

    /// Builds the tracking step that opens migration `id`.
    #[must_use]
    pub fn insert_step(&self, id: i64, version: &str, timestamp: i64) -> MigrationStep {
        MigrationStep::sql_with_values(
            self.insert_sql(),
            vec![
                QueryValue::Integer(id),
                QueryValue::Text(version.to_string()),
                QueryValue::Integer(timestamp),
            ],
        )
    }
}

/// The row returned by [`MigrationTable::select_latest_sql`].
///
/// `id` is `None` when the table exists but is empty, since `MAX` over no rows
/// yields NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    /// ID of the last applied migration.
    pub id: Option<i64>,
    /// Application version recorded with it.
    #[serde(default)]
    pub version: Option<String>,
    /// Unix timestamp (seconds) of when it was applied.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl AppliedMigration {
    /// Creates a record for migration `id`.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            version: None,
            timestamp: None,
        }
    }

    /// Sets the recorded version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the recorded timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// When the migration was applied.
    #[must_use]
    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

impl fmt::Display for AppliedMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "#{id}")?,
            None => write!(f, "#-")?,
        }
        write!(f, " (version {}", self.version.as_deref().unwrap_or("-"))?;
        if let Some(at) = self.applied_at() {
            write!(f, ", applied {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_layout() {
        let table = MigrationTable::default();
        assert_eq!(table, MigrationTable::Current);
        assert_eq!(
            table.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"migrations\" (\"id\" INTEGER NOT NULL PRIMARY KEY, \"version\" TEXT NOT NULL, \"timestamp\" INTEGER NOT NULL);"
        );
        assert_eq!(
            table.insert_sql(),
            "INSERT INTO \"migrations\" (\"id\", \"version\", \"timestamp\") VALUES (?, ?, ?);"
        );
    }

    #[test]
    fn test_legacy_layout() {
        let table = MigrationTable::Legacy;
        assert!(table.create_table_sql().contains("\"revision\" INTEGER NOT NULL PRIMARY KEY"));
        assert_eq!(
            table.select_latest_sql(),
            "SELECT MAX(\"revision\") as \"id\", \"app_version\" AS \"version\", \"date_migrated\" AS \"timestamp\" FROM \"migrations\";"
        );

        let step = table.insert_step(2, "1.4.0", 1_700_000_000);
        assert_eq!(
            step.values(),
            &[
                QueryValue::Integer(2),
                QueryValue::Text("1.4.0".into()),
                QueryValue::Integer(1_700_000_000),
            ]
        );
    }

    #[test]
    fn test_applied_migration_from_row() {
        let applied: AppliedMigration =
            serde_json::from_str(r#"{"id": 3, "version": "1.2.0", "timestamp": 0}"#).unwrap();
        assert_eq!(applied.id, Some(3));
        assert_eq!(
            applied.to_string(),
            "#3 (version 1.2.0, applied 1970-01-01 00:00:00 UTC)"
        );

        let empty: AppliedMigration =
            serde_json::from_str(r#"{"id": null, "version": null, "timestamp": null}"#).unwrap();
        assert_eq!(empty, AppliedMigration::default());
    }
}

//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::history::MigrationTable;

/// Settings that shape the compiled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version label written with every migration.
    pub app_version: String,
    /// Dialect identifier.
    pub dialect: String,
    /// Dialect version, `major.minor.patch`.
    pub dialect_version: String,
    /// ID of the first declared migration.
    pub first_migration_id: i64,
    /// Omit the PRAGMA and transaction statements around the output.
    pub ignore_transaction_statements: bool,
    /// Layout of the migrations history table.
    pub migration_table: MigrationTable,
    /// Drop and recreate tables that are created again while still tracked.
    pub replace_existing_tables: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_version: "-".to_string(),
            dialect: "sqlite".to_string(),
            dialect_version: "3.0.0".to_string(),
            first_migration_id: 1,
            ignore_transaction_statements: false,
            migration_table: MigrationTable::Current,
            replace_existing_tables: false,
        }
    }
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version label.
    #[must_use]
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Sets the dialect identifier.
    #[must_use]
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Sets the dialect version.
    #[must_use]
    pub fn with_dialect_version(mut self, version: impl Into<String>) -> Self {
        self.dialect_version = version.into();
        self
    }

    /// Sets the ID of the first migration.
    #[must_use]
    pub fn with_first_migration_id(mut self, id: i64) -> Self {
        self.first_migration_id = id;
        self
    }

    /// Omits PRAGMA and transaction statements from the output.
    #[must_use]
    pub fn with_ignore_transaction_statements(mut self, ignore: bool) -> Self {
        self.ignore_transaction_statements = ignore;
        self
    }

    /// Selects the history table layout.
    #[must_use]
    pub fn with_migration_table(mut self, table: MigrationTable) -> Self {
        self.migration_table = table;
        self
    }

    /// Drop and recreate tables that are created again.
    #[must_use]
    pub fn with_replace_existing_tables(mut self, replace: bool) -> Self {
        self.replace_existing_tables = replace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"dialect_version": "3.35.0", "migration_table": "legacy"}"#)
                .unwrap();
        assert_eq!(config.dialect_version, "3.35.0");
        assert_eq!(config.migration_table, MigrationTable::Legacy);
        assert_eq!(config.app_version, "-");
        assert_eq!(config.first_migration_id, 1);
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_app_version("2.0.0")
            .with_first_migration_id(0)
            .with_ignore_transaction_statements(true);
        assert_eq!(config.app_version, "2.0.0");
        assert_eq!(config.first_migration_id, 0);
        assert!(config.ignore_transaction_statements);
        assert!(!config.replace_existing_tables);
    }
}

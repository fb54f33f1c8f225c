//! Error types for the migration compiler.

use std::path::PathBuf;

/// Broad classification of a [`MigrateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The declared changes contradict the tracked schema.
    SchemaConflict,
    /// SQL or a script was registered outside of a migration.
    Sequencing,
    /// The dialect cannot express the requested statement.
    UnsupportedOperation,
    /// A plan file could not be read or decoded.
    Plan,
}

/// Errors that can occur while compiling migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A table with this name is already tracked.
    #[error("Table '{0}' already exists")]
    TableExists(String),

    /// The table is not tracked.
    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    /// The column already exists in the table.
    #[error("Column '{column}' already exists in table '{table}'")]
    ColumnExists {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The column does not exist in the table.
    #[error("Column '{column}' does not exist in table '{table}'")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// SQL or a script was added before `migrate()` opened a migration.
    #[error("No active migration. Call `migrate()` first")]
    NoActiveMigration,

    /// A capability-gated statement reached direct emission.
    #[error("Dialect '{dialect}' does not support {operation} for table '{table}'")]
    Unsupported {
        /// Dialect identifier.
        dialect: String,
        /// Statement kind, e.g. `DROP COLUMN`.
        operation: String,
        /// Table name.
        table: String,
    },

    /// IO error (reading plan files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode a plan file.
    #[error("Failed to parse plan file '{path}': {source}")]
    Plan {
        /// Path to the plan file.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TableExists(_)
            | Self::TableNotFound(_)
            | Self::ColumnExists { .. }
            | Self::ColumnNotFound { .. } => ErrorKind::SchemaConflict,
            Self::NoActiveMigration => ErrorKind::Sequencing,
            Self::Unsupported { .. } => ErrorKind::UnsupportedOperation,
            Self::Io(_) | Self::Plan { .. } | Self::Serialization(_) => ErrorKind::Plan,
        }
    }

    pub(crate) fn column_exists(table: &str, column: &str) -> Self {
        Self::ColumnExists {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub(crate) fn column_not_found(table: &str, column: &str) -> Self {
        Self::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            MigrateError::TableExists("users".into()).kind(),
            ErrorKind::SchemaConflict
        );
        assert_eq!(
            MigrateError::column_not_found("users", "email").kind(),
            ErrorKind::SchemaConflict
        );
        assert_eq!(
            MigrateError::NoActiveMigration.kind(),
            ErrorKind::Sequencing
        );
        assert_eq!(
            MigrateError::Unsupported {
                dialect: "sqlite".into(),
                operation: "DROP COLUMN".into(),
                table: "users".into(),
            }
            .kind(),
            ErrorKind::UnsupportedOperation
        );
    }

    #[test]
    fn test_messages() {
        let err = MigrateError::column_exists("species", "origin");
        assert_eq!(
            err.to_string(),
            "Column 'origin' already exists in table 'species'"
        );
    }
}

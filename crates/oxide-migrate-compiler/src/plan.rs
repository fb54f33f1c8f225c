//! JSON migration plan files.
//!
//! A plan describes a migration sequence as data so the CLI can compile it:
//!
//! ```json
//! {
//!   "config": { "dialect_version": "3.35.0" },
//!   "migrations": [
//!     { "operations": [
//!       { "op": "create_table", "table": "species", "columns": [
//!         { "name": "id", "type": "identity" },
//!         { "name": "name", "type": "text", "not_null": true }
//!       ] }
//!     ] },
//!     { "operations": [
//!       { "op": "rename_column", "table": "species", "old_name": "name", "new_name": "label" }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Scripts have no representation in plans.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{MigrationBuilder, Migrator};
use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::schema::{Column, ColumnParams};
use crate::step::QueryValue;

/// A whole migration sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Compiler settings.
    #[serde(default)]
    pub config: Config,
    /// Migrations in declaration order.
    #[serde(default)]
    pub migrations: Vec<PlanMigration>,
}

/// The operations of one migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMigration {
    /// Operations in declaration order.
    #[serde(default)]
    pub operations: Vec<PlanOperation>,
}

/// One declared change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanOperation {
    /// Create a table.
    CreateTable {
        /// Table name.
        table: String,
        /// Column definitions.
        columns: Vec<Column>,
    },
    /// Drop a table.
    DropTable {
        /// Table name.
        table: String,
    },
    /// Rename a table.
    RenameTable {
        /// Table name.
        table: String,
        /// New table name.
        new_name: String,
    },
    /// Add a column.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: Column,
        /// Rebuild copy params.
        #[serde(default)]
        params: Option<ColumnParams>,
    },
    /// Change a column's definition and/or params.
    ChangeColumn {
        /// Table name.
        table: String,
        /// Column name.
        name: String,
        /// New definition.
        #[serde(default)]
        column: Option<Column>,
        /// New params.
        #[serde(default)]
        params: Option<ColumnParams>,
    },
    /// Drop a column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        name: String,
    },
    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Old column name.
        old_name: String,
        /// New column name.
        new_name: String,
    },
    /// Raw SQL.
    Sql {
        /// Statement text.
        query: String,
        /// Positional values.
        #[serde(default)]
        values: Vec<QueryValue>,
    },
}

impl PlanOperation {
    fn apply(&self, m: &mut MigrationBuilder<'_>) -> Result<()> {
        match self {
            Self::CreateTable { table, columns } => {
                m.table(table).create(columns.clone())?;
            }
            Self::DropTable { table } => {
                m.table(table).drop()?;
            }
            Self::RenameTable { table, new_name } => {
                m.table(table).rename(new_name)?;
            }
            Self::AddColumn {
                table,
                column,
                params,
            } => {
                let mut builder = m.table(table);
                let mut col = builder.column(&column.name).definition(column.clone());
                if let Some(params) = params {
                    col = col.params(params.clone());
                }
                col.create()?;
            }
            Self::ChangeColumn {
                table,
                name,
                column,
                params,
            } => {
                let mut builder = m.table(table);
                let mut col = builder.column(name);
                if let Some(column) = column {
                    col = col.definition(column.clone());
                }
                if let Some(params) = params {
                    col = col.params(params.clone());
                }
                col.change()?;
            }
            Self::DropColumn { table, name } => {
                m.table(table).column(name).drop()?;
            }
            Self::RenameColumn {
                table,
                old_name,
                new_name,
            } => {
                m.table(table).column(old_name).rename(new_name)?;
            }
            Self::Sql { query, values } => {
                m.sql(query, values.clone())?;
            }
        }
        Ok(())
    }
}

impl MigrationPlan {
    /// Loads a plan from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| MigrateError::Plan {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replays the plan through a fresh [`Migrator`].
    pub fn compile(&self) -> Result<Migrator> {
        self.compile_with(self.config.clone())
    }

    /// Replays the plan with `config` in place of the plan's own settings.
    pub fn compile_with(&self, config: Config) -> Result<Migrator> {
        let mut migrator = Migrator::new(config);
        for migration in &self.migrations {
            let mut m = migrator.migrate()?;
            debug!(
                "Replaying {} operation(s) into migration {}",
                migration.operations.len(),
                m.id()
            );
            for operation in &migration.operations {
                operation.apply(&mut m)?;
            }
        }
        Ok(migrator)
    }
}

impl FromStr for MigrationPlan {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

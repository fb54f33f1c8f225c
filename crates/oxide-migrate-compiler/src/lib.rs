//! SQLite schema migrations compiled ahead of time.
//!
//! `oxide-migrate-compiler` turns a sequence of declared schema changes into
//! the SQL that carries a database from its last applied migration to the
//! latest one. Nothing is executed: the output is an ordered list of
//! statements (and script placeholders) for an external executor.
//!
//! SQLite cannot alter a column in place and only supports `DROP COLUMN` and
//! `RENAME COLUMN` from certain versions on. For every table touched between
//! two flush points the planner decides whether the queued changes can be
//! emitted as `ALTER TABLE` statements or have to be compiled into a single
//! table rebuild.
//!
//! # Architecture
//!
//! - **Registry** - What every table looks like after the last flush
//! - **Dialect** - Capability thresholds and DDL rendering
//! - **Action queue** - Structural changes waiting for the next flush
//! - **Planner** - Incremental `ALTER` or full table rebuild, per table
//! - **Context** - Migration IDs, flush points and the final step list
//! - **Builder** - Fluent API on top of the context
//!
//! # Example
//!
//! ```rust
//! use oxide_migrate_compiler::prelude::*;
//!
//! # fn main() -> oxide_migrate_compiler::error::Result<()> {
//! let mut migrator = Migrator::new(Config::default().with_dialect_version("3.35.0"));
//!
//! let mut m = migrator.migrate()?;
//! m.table("species").create(vec![
//!     Column::identity("id"),
//!     Column::text("name").not_null().default("Unnamed species"),
//!     Column::text("origin"),
//! ])?;
//!
//! let mut m = m.migrate()?;
//! m.table("species").column("origin").rename("place_of_origin")?;
//!
//! let steps = migrator.steps(None)?;
//! assert_eq!(steps[0].query(), Some("PRAGMA foreign_keys = OFF;"));
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Compile a plan file into SQL
//! oxide-migrate-compiler steps --plan migrations.json
//!
//! # Only the migrations after #3
//! oxide-migrate-compiler steps --plan migrations.json --last-applied 3
//!
//! # Row structs for the final schema
//! oxide-migrate-compiler types --plan migrations.json
//!
//! # History table DDL
//! oxide-migrate-compiler init
//! ```

pub mod action;
pub mod builder;
pub mod codegen;
pub mod config;
pub mod context;
pub mod dialect;
pub mod error;
pub mod history;
pub mod plan;
pub mod planner;
pub mod registry;
pub mod schema;
pub mod step;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::action::{ActionQueue, TableAction};
    pub use crate::builder::{ColumnBuilder, MigrationBuilder, Migrator, TableBuilder};
    pub use crate::config::Config;
    pub use crate::context::MigrationContext;
    pub use crate::dialect::{
        resolve_capabilities, Capability, DialectCapabilities, DialectVersion, MigrationDialect,
        SqliteDialect,
    };
    pub use crate::error::{ErrorKind, MigrateError, Result};
    pub use crate::history::{AppliedMigration, MigrationTable};
    pub use crate::plan::{MigrationPlan, PlanMigration, PlanOperation};
    pub use crate::planner::{PlannedBatch, RecreationPlanner};
    pub use crate::registry::SchemaRegistry;
    pub use crate::schema::{Column, ColumnParams, ColumnType, Literal, TableState};
    pub use crate::step::{Migration, MigrationStep, QueryValue};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_types_document_and_history_sql() {
        let mut migrator = Migrator::new(Config::default());
        let mut m = migrator.migrate().unwrap();
        m.table("species")
            .create(vec![Column::identity("id")])
            .unwrap();

        let types = migrator.types_document().unwrap();
        assert!(types.contains("pub struct SpeciesRow {"));
        assert_eq!(
            migrator.create_migrations_table_sql(),
            MigrationTable::Current.create_table_sql()
        );
    }
}

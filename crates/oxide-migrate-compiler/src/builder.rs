//! Fluent surface for declaring migrations.
//!
//! ```rust,ignore
//! let mut migrator = Migrator::new(Config::default().with_dialect_version("3.35.0"));
//!
//! let mut m = migrator.migrate()?;
//! m.table("species").create(vec![
//!     Column::identity("id"),
//!     Column::text("name").not_null().default("Unnamed species"),
//! ])?;
//!
//! let mut m = m.migrate()?;
//! m.table("species").column("origin").text().create()?;
//! m.sql("UPDATE \"species\" SET \"origin\" = ?;", vec!["Earth".into()])?;
//!
//! let steps = migrator.steps(None)?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::action::TableAction;
use crate::codegen;
use crate::config::Config;
use crate::context::MigrationContext;
use crate::error::Result;
use crate::history::AppliedMigration;
use crate::schema::{Column, ColumnParams, ColumnType, Literal};
use crate::step::{MigrationStep, QueryValue};

/// Entry point: owns the compilation state of one migration sequence.
#[derive(Debug)]
pub struct Migrator {
    context: MigrationContext,
}

impl Migrator {
    /// Creates a migrator with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            context: MigrationContext::new(config),
        }
    }

    /// Opens the next migration.
    pub fn migrate(&mut self) -> Result<MigrationBuilder<'_>> {
        let id = self.context.start_migration()?;
        Ok(MigrationBuilder {
            context: &mut self.context,
            id,
        })
    }

    /// Returns the steps that bring a database from `last_applied` up to date.
    pub fn steps(&mut self, last_applied: Option<&AppliedMigration>) -> Result<Vec<MigrationStep>> {
        self.context.steps(last_applied)
    }

    /// Renders Rust row structs for every table of the final schema.
    pub fn types_document(&mut self) -> Result<String> {
        self.context.flush()?;
        Ok(codegen::render_types(self.context.registry()))
    }

    /// SQL creating the configured migrations history table.
    #[must_use]
    pub fn create_migrations_table_sql(&self) -> &'static str {
        self.context.config().migration_table.create_table_sql()
    }

    /// SQL reading the last applied migration.
    #[must_use]
    pub fn select_latest_sql(&self) -> &'static str {
        self.context.config().migration_table.select_latest_sql()
    }

    /// Returns the underlying context.
    #[must_use]
    pub fn context(&self) -> &MigrationContext {
        &self.context
    }
}

/// Declares the contents of one migration.
#[derive(Debug)]
pub struct MigrationBuilder<'a> {
    context: &'a mut MigrationContext,
    id: i64,
}

impl<'a> MigrationBuilder<'a> {
    /// ID of this migration.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Starts declaring changes to `name`.
    pub fn table(&mut self, name: impl Into<String>) -> TableBuilder<'_> {
        TableBuilder {
            context: &mut *self.context,
            name: name.into(),
        }
    }

    /// Appends raw SQL; pending table changes are compiled first.
    pub fn sql(&mut self, query: impl Into<String>, values: Vec<QueryValue>) -> Result<&mut Self> {
        self.context.add_sql(query, values)?;
        Ok(self)
    }

    /// Appends a script run by the executor at this position.
    pub fn script<F>(&mut self, script: F) -> Result<&mut Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.context.add_script(Arc::new(script))?;
        Ok(self)
    }

    /// Appends an async script run by the executor at this position.
    pub fn async_script<F, Fut>(&mut self, script: F) -> Result<&mut Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.context
            .add_async_script(Arc::new(move || script().boxed()))?;
        Ok(self)
    }

    /// Closes this migration and opens the next one.
    pub fn migrate(self) -> Result<MigrationBuilder<'a>> {
        let id = self.context.start_migration()?;
        Ok(MigrationBuilder {
            context: self.context,
            id,
        })
    }
}

/// Declares changes to one table.
#[derive(Debug)]
pub struct TableBuilder<'a> {
    context: &'a mut MigrationContext,
    name: String,
}

impl TableBuilder<'_> {
    /// Table name the changes are queued under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the table.
    pub fn create(&mut self, columns: Vec<Column>) -> Result<&mut Self> {
        self.push(TableAction::create_table(columns))
    }

    /// Drops the table.
    pub fn drop(&mut self) -> Result<&mut Self> {
        self.push(TableAction::DropTable)
    }

    /// Renames the table.
    ///
    /// Later calls on this builder apply to the renamed table.
    pub fn rename(&mut self, new_name: impl Into<String>) -> Result<&mut Self> {
        let new_name = new_name.into();
        self.context
            .enqueue(self.name.clone(), TableAction::rename_table(new_name.clone()))?;
        self.name = new_name;
        Ok(self)
    }

    /// Starts declaring a change to column `name`.
    pub fn column(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        let name = name.into();
        ColumnBuilder {
            context: &mut *self.context,
            table: self.name.clone(),
            column: Column::text(name.clone()),
            name,
            typed: false,
            params: None,
        }
    }

    fn push(&mut self, action: TableAction) -> Result<&mut Self> {
        self.context.enqueue(self.name.clone(), action)?;
        Ok(self)
    }
}

/// Declares a change to one column.
///
/// Type and flag setters shape the definition used by [`create`](Self::create)
/// and [`change`](Self::change); `fill_from` and `coalesce` only affect how
/// data is copied the next time the table is rebuilt.
#[derive(Debug)]
#[must_use]
pub struct ColumnBuilder<'a> {
    context: &'a mut MigrationContext,
    table: String,
    name: String,
    column: Column,
    typed: bool,
    params: Option<ColumnParams>,
}

impl ColumnBuilder<'_> {
    fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column.column_type = column_type;
        self.typed = true;
        self
    }

    /// Uses `column` as the definition; its name is replaced by this column's.
    pub fn definition(mut self, column: Column) -> Self {
        self.column = Column {
            name: self.name.clone(),
            ..column
        };
        self.typed = true;
        self
    }

    /// Identity column.
    pub fn identity(self) -> Self {
        self.with_type(ColumnType::Identity)
    }

    /// Integer column.
    pub fn integer(self) -> Self {
        self.with_type(ColumnType::Integer)
    }

    /// Text column.
    pub fn text(self) -> Self {
        self.with_type(ColumnType::Text)
    }

    /// Real column.
    pub fn real(self) -> Self {
        self.with_type(ColumnType::Real)
    }

    /// Blob column.
    pub fn blob(self) -> Self {
        self.with_type(ColumnType::Blob)
    }

    /// Foreign column referencing `table`.
    pub fn foreign(mut self, table: impl Into<String>) -> Self {
        self.column.references = Some(table.into());
        self.with_type(ColumnType::Foreign)
    }

    /// Part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.column.primary_key = true;
        self.typed = true;
        self
    }

    /// Auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.column.auto_increment = true;
        self.typed = true;
        self
    }

    /// NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.column.not_null = true;
        self.typed = true;
        self
    }

    /// Part of the UNIQUE clause.
    pub fn unique(mut self) -> Self {
        self.column.unique = true;
        self.typed = true;
        self
    }

    /// Default value.
    pub fn default(mut self, value: impl Into<Literal>) -> Self {
        self.column.default = Some(value.into());
        self.typed = true;
        self
    }

    /// Replaces the rebuild params.
    pub fn params(mut self, params: ColumnParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Reads the data from `column` on the next rebuild.
    pub fn fill_from(mut self, column: impl Into<String>) -> Self {
        self.params = Some(self.params.take().unwrap_or_default().fill_from(column));
        self
    }

    /// Falls back to `value` for NULLs on the next rebuild.
    pub fn coalesce(mut self, value: impl Into<Literal>) -> Self {
        self.params = Some(self.params.take().unwrap_or_default().coalesce(value));
        self
    }

    /// Adds the column. A column with no type set is nullable TEXT.
    pub fn create(self) -> Result<()> {
        let action = TableAction::add_column(self.column, self.params);
        self.context.enqueue(self.table, action)
    }

    /// Replaces the column's definition and/or params.
    ///
    /// The definition is only replaced when a type or flag was set.
    pub fn change(self) -> Result<()> {
        let column = self.typed.then_some(self.column);
        let action = TableAction::change_column(self.name, column, self.params);
        self.context.enqueue(self.table, action)
    }

    /// Drops the column.
    pub fn drop(self) -> Result<()> {
        self.context
            .enqueue(self.table, TableAction::drop_column(self.name))
    }

    /// Renames the column.
    pub fn rename(self, new_name: impl Into<String>) -> Result<()> {
        self.context
            .enqueue(self.table, TableAction::rename_column(self.name, new_name))
    }
}

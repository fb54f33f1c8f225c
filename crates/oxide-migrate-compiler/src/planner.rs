//! Recreation planner.
//!
//! Decides, per table and per flush, whether the queued actions can be
//! expressed as plain `ALTER TABLE` statements or have to be folded into a
//! single table rebuild. The decision is taken for the batch as a whole: as
//! soon as one action needs a rebuild, every action of the batch is applied to
//! a scratch copy of the table and one CREATE/INSERT/DROP/RENAME sequence is
//! emitted for the final shape.
//!
//! `CreateTable` and `DropTable` never force a rebuild. They split a table's
//! batch into segments, and each run of actions between them is planned on
//! its own.

use tracing::debug;

use crate::action::TableAction;
use crate::dialect::{DialectCapabilities, SqliteDialect};
use crate::error::{MigrateError, Result};
use crate::registry::SchemaRegistry;
use crate::schema::TableState;

/// Outcome of planning one table's queued actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBatch {
    /// Name of the table after the batch (differs on rename).
    pub table: String,
    /// Statements to append to the current migration.
    pub statements: Vec<String>,
    /// Number of rebuild sequences among `statements`.
    pub rebuilds: usize,
}

/// Compiles queued table actions into SQL.
#[derive(Debug, Clone)]
pub struct RecreationPlanner {
    dialect: SqliteDialect,
    dialect_name: String,
    capabilities: DialectCapabilities,
    replace_existing_tables: bool,
}

impl RecreationPlanner {
    /// Creates a planner for the given dialect capabilities.
    #[must_use]
    pub fn new(dialect_name: impl Into<String>, capabilities: DialectCapabilities) -> Self {
        Self {
            dialect: SqliteDialect::new(),
            dialect_name: dialect_name.into(),
            capabilities,
            replace_existing_tables: false,
        }
    }

    /// Drop and recreate tables that `CreateTable` finds already tracked,
    /// instead of failing.
    #[must_use]
    pub fn replace_existing_tables(mut self, replace: bool) -> Self {
        self.replace_existing_tables = replace;
        self
    }

    /// Returns the capabilities the planner decides with.
    #[must_use]
    pub fn capabilities(&self) -> DialectCapabilities {
        self.capabilities
    }

    /// Plans the queued actions of one table and applies them to `registry`.
    ///
    /// Every action resolves against `table`. A table rename ends the current
    /// segment, so actions queued after it under the old name see that name
    /// freed.
    ///
    /// On error the registry may hold a partial result; callers plan against
    /// a scratch copy and only keep it on success.
    pub fn plan(
        &self,
        registry: &mut SchemaRegistry,
        table: &str,
        actions: Vec<TableAction>,
    ) -> Result<PlannedBatch> {
        let mut batch = PlannedBatch {
            table: table.to_string(),
            statements: Vec::new(),
            rebuilds: 0,
        };

        let mut segment = Vec::new();
        for action in actions {
            if action.is_terminal() {
                self.plan_segment(registry, table, &mut batch, std::mem::take(&mut segment))?;
                self.apply_terminal(registry, table, &mut batch, action)?;
            } else if matches!(action, TableAction::RenameTable { .. }) {
                segment.push(action);
                self.plan_segment(registry, table, &mut batch, std::mem::take(&mut segment))?;
            } else {
                segment.push(action);
            }
        }
        self.plan_segment(registry, table, &mut batch, segment)?;

        Ok(batch)
    }

    /// Returns whether `action`, applied on top of `state`, needs a rebuild.
    #[must_use]
    pub fn forces_rebuild(&self, state: &TableState, action: &TableAction) -> bool {
        match action {
            TableAction::CreateTable { .. } | TableAction::DropTable => false,
            TableAction::AddColumn { column, params } => {
                column.is_identity()
                    || column.primary_key
                    || params.as_ref().is_some_and(|p| p.fill_from.is_some())
            }
            TableAction::ChangeColumn { .. } => true,
            TableAction::DropColumn { name } => {
                !self.capabilities.can_drop_column
                    || state
                        .get_column(name)
                        .is_some_and(|c| c.is_identity() || c.is_foreign() || c.primary_key)
            }
            TableAction::RenameColumn { .. } => !self.capabilities.can_rename_column,
            TableAction::RenameTable { .. } => !self.capabilities.can_rename_table,
        }
    }

    fn plan_segment(
        &self,
        registry: &mut SchemaRegistry,
        source: &str,
        batch: &mut PlannedBatch,
        actions: Vec<TableAction>,
    ) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }

        let mut target = registry
            .get_table(source)
            .cloned()
            .ok_or_else(|| MigrateError::TableNotFound(source.to_string()))?;

        let mut rebuild = false;
        for action in &actions {
            if !rebuild && self.forces_rebuild(&target, action) {
                debug!(
                    "{} forces recreation of table '{}'",
                    action.description(&target.name),
                    source
                );
                rebuild = true;
            }
            apply_to_state(registry, &mut target, action)?;
        }

        if rebuild {
            batch
                .statements
                .extend(self.dialect.recreate_table_sql(source, &target));
            batch.rebuilds += 1;
            target.params.clear();
        } else {
            let mut current = source.to_string();
            for action in &actions {
                let sql = self.direct_sql(&mut current, action)?;
                batch.statements.push(sql);
            }
        }
        target.clear_history();

        debug!(
            "Planned {} action(s) on table '{}' ({})",
            actions.len(),
            source,
            if rebuild { "rebuild" } else { "incremental" }
        );

        batch.table = target.name.clone();
        registry.replace(source, target)
    }

    fn apply_terminal(
        &self,
        registry: &mut SchemaRegistry,
        name: &str,
        batch: &mut PlannedBatch,
        action: TableAction,
    ) -> Result<()> {
        batch.table = name.to_string();
        match action {
            TableAction::CreateTable { columns } => {
                let sql = self.dialect.create_table_sql(name, &columns);
                let table = TableState::new(name, columns)?;
                if registry.contains(name) {
                    if !self.replace_existing_tables {
                        return Err(MigrateError::TableExists(name.to_string()));
                    }
                    debug!("Replacing existing table '{}'", name);
                    registry.remove(name)?;
                    batch.statements.push(self.dialect.drop_table_sql(name));
                }
                registry.insert(table)?;
                batch.statements.push(sql);
            }
            TableAction::DropTable => {
                registry.remove(name)?;
                batch.statements.push(self.dialect.drop_table_sql(name));
            }
            other => {
                return Err(self.unsupported(other.description(name), name));
            }
        }
        Ok(())
    }

    fn direct_sql(&self, current: &mut String, action: &TableAction) -> Result<String> {
        match action {
            TableAction::AddColumn { column, .. } => {
                Ok(self.dialect.add_column_sql(current, column))
            }
            TableAction::DropColumn { name } => {
                if !self.capabilities.can_drop_column {
                    return Err(self.unsupported("DROP COLUMN", current));
                }
                Ok(self.dialect.drop_column_sql(current, name))
            }
            TableAction::RenameColumn { old_name, new_name } => {
                if !self.capabilities.can_rename_column {
                    return Err(self.unsupported("RENAME COLUMN", current));
                }
                Ok(self.dialect.rename_column_sql(current, old_name, new_name))
            }
            TableAction::RenameTable { new_name } => {
                if !self.capabilities.can_rename_table {
                    return Err(self.unsupported("RENAME TABLE", current));
                }
                let sql = self.dialect.rename_table_sql(current, new_name);
                *current = new_name.clone();
                Ok(sql)
            }
            TableAction::ChangeColumn { .. } => Err(self.unsupported("ALTER COLUMN", current)),
            TableAction::CreateTable { .. } | TableAction::DropTable => {
                Err(self.unsupported(action.description(current), current))
            }
        }
    }

    fn unsupported(&self, operation: impl Into<String>, table: &str) -> MigrateError {
        MigrateError::Unsupported {
            dialect: self.dialect_name.clone(),
            operation: operation.into(),
            table: table.to_string(),
        }
    }
}

/// Applies a structural action to a scratch table state.
fn apply_to_state(
    registry: &SchemaRegistry,
    state: &mut TableState,
    action: &TableAction,
) -> Result<()> {
    match action {
        TableAction::AddColumn { column, params } => {
            state.add_column(column.clone(), params.clone())
        }
        TableAction::ChangeColumn {
            name,
            column,
            params,
        } => state.change_column(name, column.clone(), params.clone()),
        TableAction::DropColumn { name } => state.drop_column(name).map(|_| ()),
        TableAction::RenameColumn { old_name, new_name } => {
            state.rename_column(old_name, new_name)
        }
        TableAction::RenameTable { new_name } => {
            if registry.contains(new_name) {
                return Err(MigrateError::TableExists(new_name.clone()));
            }
            let old_name = std::mem::replace(&mut state.name, new_name.clone());
            state.retarget_references(&old_name, new_name);
            Ok(())
        }
        TableAction::CreateTable { .. } | TableAction::DropTable => Ok(()),
    }
}

//! Migration sequencer and step emitter.
//!
//! [`MigrationContext`] owns everything a compilation needs: the schema
//! registry, the queue of pending table actions and the migrations compiled so
//! far. Builder calls land here; the planner runs whenever a flush point is
//! reached.

use tracing::{debug, info, warn};

use crate::action::{ActionQueue, TableAction};
use crate::config::Config;
use crate::dialect::{resolve_capabilities, DialectCapabilities};
use crate::error::{MigrateError, Result};
use crate::history::AppliedMigration;
use crate::planner::RecreationPlanner;
use crate::registry::SchemaRegistry;
use crate::step::{AsyncScript, Migration, MigrationStep, QueryValue, Script};

/// Statements bracketing the compiled delta.
pub const PRELUDE: [&str; 2] = ["PRAGMA foreign_keys = OFF;", "BEGIN TRANSACTION;"];

/// Statements closing the compiled delta.
pub const EPILOGUE: [&str; 2] = ["COMMIT TRANSACTION;", "PRAGMA foreign_keys = ON;"];

/// Compilation state for one migration sequence.
#[derive(Debug)]
pub struct MigrationContext {
    config: Config,
    planner: RecreationPlanner,
    registry: SchemaRegistry,
    queue: ActionQueue,
    migrations: Vec<Migration>,
}

impl MigrationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let capabilities = resolve_capabilities(&config.dialect, &config.dialect_version);
        debug!(
            "Dialect {} {}: {:?}",
            config.dialect, config.dialect_version, capabilities
        );
        let planner = RecreationPlanner::new(config.dialect.clone(), capabilities)
            .replace_existing_tables(config.replace_existing_tables);
        Self {
            config,
            planner,
            registry: SchemaRegistry::new(),
            queue: ActionQueue::new(),
            migrations: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the resolved dialect capabilities.
    #[must_use]
    pub fn capabilities(&self) -> DialectCapabilities {
        self.planner.capabilities()
    }

    /// Returns the schema as of the last flush.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Returns the migrations compiled so far.
    #[must_use]
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Returns the ID of the migration currently receiving steps.
    #[must_use]
    pub fn current_id(&self) -> Option<i64> {
        self.migrations.last().map(|m| m.id)
    }

    /// Returns the ID the last declared migration ends up with.
    #[must_use]
    pub fn target_id(&self) -> i64 {
        self.next_id() - 1
    }

    fn next_id(&self) -> i64 {
        // Vec lengths always fit in i64.
        self.migrations.len() as i64 + self.config.first_migration_id
    }

    /// Closes the current migration and opens the next one.
    ///
    /// Returns the new migration's ID.
    pub fn start_migration(&mut self) -> Result<i64> {
        self.flush()?;

        let id = self.next_id();
        let mut migration = Migration::new(id);
        migration.steps.push(self.config.migration_table.insert_step(
            id,
            &self.config.app_version,
            chrono::Utc::now().timestamp(),
        ));
        self.migrations.push(migration);

        debug!("Started migration {}", id);
        Ok(id)
    }

    /// Queues a structural action for `table`.
    pub fn enqueue(&mut self, table: impl Into<String>, action: TableAction) -> Result<()> {
        if self.migrations.is_empty() {
            return Err(MigrateError::NoActiveMigration);
        }
        self.queue.push(table, action);
        Ok(())
    }

    /// Appends a raw SQL step to the current migration.
    pub fn add_sql(&mut self, query: impl Into<String>, values: Vec<QueryValue>) -> Result<()> {
        self.push_step(MigrationStep::sql_with_values(query, values))
    }

    /// Appends a script step to the current migration.
    pub fn add_script(&mut self, script: Script) -> Result<()> {
        self.push_step(MigrationStep::Script(script))
    }

    /// Appends an async script step to the current migration.
    pub fn add_async_script(&mut self, script: AsyncScript) -> Result<()> {
        self.push_step(MigrationStep::AsyncScript(script))
    }

    fn push_step(&mut self, step: MigrationStep) -> Result<()> {
        if self.migrations.is_empty() {
            return Err(MigrateError::NoActiveMigration);
        }
        self.flush()?;
        self.current_mut()?.steps.push(step);
        Ok(())
    }

    fn current_mut(&mut self) -> Result<&mut Migration> {
        self.migrations
            .last_mut()
            .ok_or(MigrateError::NoActiveMigration)
    }

    /// Compiles every pending table action into the current migration.
    ///
    /// Either all pending tables compile and the registry moves forward, or
    /// nothing is emitted and the context is left as it was.
    pub fn flush(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }

        let mut pending = self.queue.clone();
        let mut registry = self.registry.clone();
        let mut statements = Vec::new();
        while let Some((table, actions)) = pending.pop_batch() {
            let batch = self.planner.plan(&mut registry, &table, actions)?;
            if batch.rebuilds > 0 {
                debug!(
                    "Table '{}' rebuilt {} time(s) in migration {:?}",
                    batch.table,
                    batch.rebuilds,
                    self.current_id()
                );
            }
            statements.extend(batch.statements);
        }

        let migration = self.current_mut()?;
        migration
            .steps
            .extend(statements.into_iter().map(MigrationStep::sql));
        self.registry = registry;
        self.queue = ActionQueue::new();
        Ok(())
    }

    /// Assembles the steps that bring a database from `last_applied` to the
    /// latest declared migration.
    ///
    /// `None` means no migration was ever applied.
    pub fn steps(&mut self, last_applied: Option<&AppliedMigration>) -> Result<Vec<MigrationStep>> {
        self.flush()?;

        if self.migrations.is_empty() {
            info!("No migrations found");
            return Ok(Vec::new());
        }

        let offset = self.config.first_migration_id;
        let target = self.target_id();
        let latest = match last_applied {
            Some(applied) => {
                info!("Last applied migration: {}", applied);
                applied.id.unwrap_or(offset - 1)
            }
            None => {
                info!("No applied migrations recorded");
                offset - 1
            }
        };

        if latest == target {
            info!("Database is up-to-date");
            return Ok(Vec::new());
        }
        if latest > target {
            warn!(
                "Database is at migration {} but only {} migration(s) are declared",
                latest, target
            );
            return Ok(Vec::new());
        }

        info!("Target migration ID: {}", target);

        let bracketed = !self.config.ignore_transaction_statements;
        let mut steps = Vec::new();
        if bracketed {
            steps.extend(PRELUDE.iter().map(|q| MigrationStep::sql(*q)));
        }
        for migration in self.migrations.iter().filter(|m| m.id > latest) {
            steps.extend(migration.steps.iter().cloned());
        }
        if bracketed {
            steps.extend(EPILOGUE.iter().map(|q| MigrationStep::sql(*q)));
        }

        info!("...{} step(s) have been generated", steps.len());
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::history::MigrationTable;
    use crate::schema::Column;

    fn species_columns() -> Vec<Column> {
        vec![
            Column::identity("id"),
            Column::text("name").not_null(),
            Column::text("origin"),
        ]
    }

    fn queries(steps: &[MigrationStep]) -> Vec<&str> {
        steps.iter().filter_map(MigrationStep::query).collect()
    }

    #[test]
    fn test_sql_before_migration() {
        let mut context = MigrationContext::new(Config::default());
        let result = context.add_sql("SELECT 1;", vec![]);
        assert!(matches!(result, Err(MigrateError::NoActiveMigration)));

        let result = context.enqueue("species", TableAction::DropTable);
        assert!(matches!(result, Err(MigrateError::NoActiveMigration)));

        let result = context.add_script(Arc::new(|| {}));
        assert!(matches!(result, Err(MigrateError::NoActiveMigration)));
    }

    #[test]
    fn test_migration_ids_and_tracking_insert() {
        let mut context =
            MigrationContext::new(Config::default().with_app_version("1.0.0"));
        assert_eq!(context.start_migration().unwrap(), 1);
        assert_eq!(context.start_migration().unwrap(), 2);
        assert_eq!(context.target_id(), 2);

        let first = &context.migrations()[0];
        assert_eq!(
            first.steps[0].query(),
            Some(MigrationTable::Current.insert_sql())
        );
        assert_eq!(first.steps[0].values()[0], QueryValue::Integer(1));
        assert_eq!(first.steps[0].values()[1], QueryValue::Text("1.0.0".into()));
    }

    #[test]
    fn test_raw_sql_sees_flushed_ddl() {
        let mut context = MigrationContext::new(Config::default());
        context.start_migration().unwrap();
        context
            .enqueue("species", TableAction::create_table(species_columns()))
            .unwrap();
        context
            .add_sql(
                "INSERT INTO \"species\" (\"name\") VALUES (?);",
                vec!["Human".into()],
            )
            .unwrap();

        let migration = &context.migrations()[0];
        assert_eq!(migration.steps.len(), 3);
        assert!(migration.steps[1]
            .query()
            .unwrap()
            .starts_with("CREATE TABLE \"species\""));
        assert_eq!(migration.steps[2].values(), &[QueryValue::Text("Human".into())]);
        assert!(context.registry().contains("species"));
    }

    #[test]
    fn test_failed_flush_leaves_state_untouched() {
        let mut context = MigrationContext::new(Config::default());
        context.start_migration().unwrap();
        context
            .enqueue("species", TableAction::create_table(species_columns()))
            .unwrap();
        context.flush().unwrap();

        context
            .enqueue("species", TableAction::drop_column("origin"))
            .unwrap();
        context
            .enqueue("planets", TableAction::drop_column("name"))
            .unwrap();
        let result = context.flush();
        assert!(matches!(result, Err(MigrateError::TableNotFound(_))));

        assert_eq!(context.migrations()[0].steps.len(), 2);
        let species = context.registry().get_table("species").unwrap();
        assert!(species.get_column("origin").is_some());
    }

    #[test]
    fn test_steps_brackets_once_and_stops_at_target() {
        let mut context = MigrationContext::new(Config::default());
        context.start_migration().unwrap();
        context
            .enqueue("species", TableAction::create_table(species_columns()))
            .unwrap();
        context.start_migration().unwrap();
        context
            .enqueue("species", TableAction::rename_column("origin", "home"))
            .unwrap();

        let steps = context.steps(None).unwrap();
        let queries = queries(&steps);
        assert_eq!(queries.first(), Some(&"PRAGMA foreign_keys = OFF;"));
        assert_eq!(queries[1], "BEGIN TRANSACTION;");
        assert_eq!(queries[queries.len() - 2], "COMMIT TRANSACTION;");
        assert_eq!(queries.last(), Some(&"PRAGMA foreign_keys = ON;"));
        assert_eq!(
            queries.iter().filter(|q| q.starts_with("BEGIN")).count(),
            1
        );

        let applied = AppliedMigration::new(2);
        assert!(context.steps(Some(&applied)).unwrap().is_empty());
    }

    #[test]
    fn test_steps_from_last_applied() {
        let mut context = MigrationContext::new(
            Config::default().with_ignore_transaction_statements(true),
        );
        context.start_migration().unwrap();
        context.add_sql("SELECT 1;", vec![]).unwrap();
        context.start_migration().unwrap();
        context.add_sql("SELECT 2;", vec![]).unwrap();

        let steps = context.steps(Some(&AppliedMigration::new(1))).unwrap();
        let queries = queries(&steps);
        assert_eq!(queries.len(), 2);
        assert_eq!(steps[0].values()[0], QueryValue::Integer(2));
        assert_eq!(queries[1], "SELECT 2;");
    }

    #[test]
    fn test_empty_tracking_table_reads_as_nothing_applied() {
        let mut context = MigrationContext::new(Config::default().with_first_migration_id(0));
        context.start_migration().unwrap();

        let steps = context.steps(Some(&AppliedMigration::default())).unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[2].values()[0], QueryValue::Integer(0));
    }

    #[test]
    fn test_no_migrations_and_database_ahead() {
        let mut context = MigrationContext::new(Config::default());
        assert!(context.steps(None).unwrap().is_empty());

        context.start_migration().unwrap();
        assert!(context
            .steps(Some(&AppliedMigration::new(5)))
            .unwrap()
            .is_empty());
    }
}

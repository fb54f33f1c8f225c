//! Structural table actions and the per-table queue they wait in.
//!
//! Builder calls never touch the registry directly: they enqueue a
//! [`TableAction`] under the table's name and the planner resolves the whole
//! queue for a table at the next flush point.

use crate::schema::{Column, ColumnParams};

/// A single structural change to one table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    /// Create the table with the given columns.
    CreateTable {
        /// Column definitions.
        columns: Vec<Column>,
    },

    /// Drop the table.
    DropTable,

    /// Rename the table.
    RenameTable {
        /// New table name.
        new_name: String,
    },

    /// Add a column.
    AddColumn {
        /// Column definition.
        column: Column,
        /// Rebuild copy params.
        params: Option<ColumnParams>,
    },

    /// Replace a column's definition and/or params.
    ChangeColumn {
        /// Column name.
        name: String,
        /// New definition, if changing it.
        column: Option<Column>,
        /// New params, if changing them.
        params: Option<ColumnParams>,
    },

    /// Drop a column.
    DropColumn {
        /// Column name.
        name: String,
    },

    /// Rename a column.
    RenameColumn {
        /// Old column name.
        old_name: String,
        /// New column name.
        new_name: String,
    },
}

impl TableAction {
    /// Creates a CreateTable action.
    #[must_use]
    pub fn create_table(columns: Vec<Column>) -> Self {
        Self::CreateTable { columns }
    }

    /// Creates a RenameTable action.
    #[must_use]
    pub fn rename_table(new_name: impl Into<String>) -> Self {
        Self::RenameTable {
            new_name: new_name.into(),
        }
    }

    /// Creates an AddColumn action.
    #[must_use]
    pub fn add_column(column: Column, params: Option<ColumnParams>) -> Self {
        Self::AddColumn { column, params }
    }

    /// Creates a ChangeColumn action.
    #[must_use]
    pub fn change_column(
        name: impl Into<String>,
        column: Option<Column>,
        params: Option<ColumnParams>,
    ) -> Self {
        Self::ChangeColumn {
            name: name.into(),
            column,
            params,
        }
    }

    /// Creates a DropColumn action.
    #[must_use]
    pub fn drop_column(name: impl Into<String>) -> Self {
        Self::DropColumn { name: name.into() }
    }

    /// Creates a RenameColumn action.
    #[must_use]
    pub fn rename_column(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self::RenameColumn {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }

    /// Returns true for actions that start or end a table's lifetime.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CreateTable { .. } | Self::DropTable)
    }

    /// Table names this action reads or claims when queued under `table`.
    #[must_use]
    pub fn table_names<'a>(&'a self, table: &'a str) -> Vec<&'a str> {
        match self {
            Self::RenameTable { new_name } => vec![table, new_name.as_str()],
            _ => vec![table],
        }
    }

    /// Returns a human-readable description of this action.
    #[must_use]
    pub fn description(&self, table: &str) -> String {
        match self {
            Self::CreateTable { .. } => format!("Create table '{table}'"),
            Self::DropTable => format!("Drop table '{table}'"),
            Self::RenameTable { new_name } => {
                format!("Rename table '{table}' to '{new_name}'")
            }
            Self::AddColumn { column, .. } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::ChangeColumn { name, .. } => {
                format!("Change column '{name}' in table '{table}'")
            }
            Self::DropColumn { name } => format!("Drop column '{name}' from table '{table}'"),
            Self::RenameColumn { old_name, new_name } => {
                format!("Rename column '{old_name}' to '{new_name}' in table '{table}'")
            }
        }
    }
}

/// Actions queued for one table, planned together.
#[derive(Debug, Clone)]
struct PendingBatch {
    table: String,
    actions: Vec<TableAction>,
    names: Vec<String>,
    open: bool,
}

impl PendingBatch {
    fn touches(&self, names: &[&str]) -> bool {
        self.names.iter().any(|n| names.contains(&n.as_str()))
    }
}

/// Pending actions, grouped into per-table batches.
///
/// An action joins the latest open batch of its table unless a batch queued
/// after that one touches a table name the action touches. A table rename
/// closes its batch: later actions under the old name start a new one. Batches
/// drain in the order they were opened.
#[derive(Debug, Clone, Default)]
pub struct ActionQueue {
    batches: Vec<PendingBatch>,
}

impl ActionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an action for a table.
    pub fn push(&mut self, table: impl Into<String>, action: TableAction) {
        let table = table.into();
        let names = action.table_names(&table);
        let closes = matches!(action, TableAction::RenameTable { .. });

        let joinable = self
            .batches
            .iter()
            .rposition(|b| b.open && b.table == table)
            .filter(|&idx| !self.batches[idx + 1..].iter().any(|b| b.touches(&names)));

        match joinable {
            Some(idx) => {
                let batch = &mut self.batches[idx];
                for name in names {
                    if !batch.names.iter().any(|n| n == name) {
                        batch.names.push(name.to_string());
                    }
                }
                batch.actions.push(action);
                batch.open = !closes;
            }
            None => {
                let names = names.into_iter().map(str::to_string).collect();
                self.batches.push(PendingBatch {
                    table,
                    actions: vec![action],
                    names,
                    open: !closes,
                });
            }
        }
    }

    /// Removes and returns the oldest batch.
    pub fn pop_batch(&mut self) -> Option<(String, Vec<TableAction>)> {
        if self.batches.is_empty() {
            None
        } else {
            let batch = self.batches.remove(0);
            Some((batch.table, batch.actions))
        }
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut queue: ActionQueue) -> Vec<(String, usize)> {
        let mut batches = Vec::new();
        while let Some((table, actions)) = queue.pop_batch() {
            batches.push((table, actions.len()));
        }
        batches
    }

    #[test]
    fn test_push_groups_by_table() {
        let mut queue = ActionQueue::new();
        queue.push("species", TableAction::drop_column("origin"));
        queue.push("people", TableAction::DropTable);
        queue.push("species", TableAction::rename_column("name", "label"));

        let (first, actions) = queue.pop_batch().unwrap();
        assert_eq!(first, "species");
        assert_eq!(
            actions,
            vec![
                TableAction::drop_column("origin"),
                TableAction::rename_column("name", "label"),
            ]
        );
        assert_eq!(queue.pop_batch().unwrap().0, "people");
        assert!(queue.pop_batch().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_rename_closes_its_batch() {
        let mut queue = ActionQueue::new();
        queue.push("species", TableAction::drop_column("origin"));
        queue.push("species", TableAction::rename_table("species_archive"));
        queue.push("species", TableAction::DropTable);

        assert_eq!(
            drain(queue),
            vec![("species".to_string(), 2), ("species".to_string(), 1)]
        );
    }

    #[test]
    fn test_claimed_names_keep_declaration_order() {
        let mut queue = ActionQueue::new();
        queue.push("x", TableAction::create_table(vec![]));
        queue.push("y", TableAction::rename_table("z"));
        queue.push("x", TableAction::rename_table("y"));

        assert_eq!(
            drain(queue),
            vec![
                ("x".to_string(), 1),
                ("y".to_string(), 1),
                ("x".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_unrelated_tables_do_not_split_a_batch() {
        let mut queue = ActionQueue::new();
        queue.push("species", TableAction::drop_column("origin"));
        queue.push("planets", TableAction::create_table(vec![]));
        queue.push("species", TableAction::drop_column("population"));

        assert_eq!(
            drain(queue),
            vec![("species".to_string(), 2), ("planets".to_string(), 1)]
        );
    }

    #[test]
    fn test_description() {
        let action = TableAction::rename_column("origin", "place_of_origin");
        assert_eq!(
            action.description("species"),
            "Rename column 'origin' to 'place_of_origin' in table 'species'"
        );
        assert!(TableAction::DropTable.is_terminal());
        assert!(!action.is_terminal());
    }
}

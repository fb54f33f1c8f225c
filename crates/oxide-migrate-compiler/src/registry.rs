//! In-memory record of what every table currently looks like.
//!
//! The registry is updated after each flushed batch and is the only input the
//! planner uses to decide how the next batch is compiled.

use crate::error::{MigrateError, Result};
use crate::schema::TableState;

/// Tracked tables, in creation order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: Vec<TableState>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableState> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns true if the table is tracked.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get_table(name).is_some()
    }

    /// Starts tracking a new table.
    pub fn insert(&mut self, table: TableState) -> Result<()> {
        if self.contains(&table.name) {
            return Err(MigrateError::TableExists(table.name));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Replaces the state stored under `name` with `table`, keeping its slot.
    ///
    /// `table.name` may differ from `name` when the table was renamed.
    pub fn replace(&mut self, name: &str, table: TableState) -> Result<()> {
        let idx = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| MigrateError::TableNotFound(name.to_string()))?;
        if table.name != name {
            if self.contains(&table.name) {
                return Err(MigrateError::TableExists(table.name));
            }
            self.retarget_references(name, &table.name);
        }
        self.tables[idx] = table;
        Ok(())
    }

    /// Stops tracking a table.
    pub fn remove(&mut self, name: &str) -> Result<TableState> {
        let idx = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| MigrateError::TableNotFound(name.to_string()))?;
        Ok(self.tables.remove(idx))
    }

    fn retarget_references(&mut self, old_name: &str, new_name: &str) {
        for table in &mut self.tables {
            table.retarget_references(old_name, new_name);
        }
    }

    /// Iterates over tracked tables.
    pub fn iter(&self) -> impl Iterator<Item = &TableState> {
        self.tables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .insert(TableState::new("species", vec![Column::identity("id")]).unwrap())
            .unwrap();
        registry
            .insert(
                TableState::new(
                    "people",
                    vec![Column::identity("id"), Column::foreign("talisman", "species")],
                )
                .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut registry = registry();
        let result = registry.insert(TableState::new("species", vec![]).unwrap());
        assert!(matches!(result, Err(MigrateError::TableExists(_))));
    }

    #[test]
    fn test_replace_under_new_name_rewrites_references() {
        let mut registry = registry();
        let mut kinds = registry.get_table("species").unwrap().clone();
        kinds.name = "kinds".to_string();
        registry.replace("species", kinds).unwrap();

        assert!(registry.get_table("species").is_none());
        let people = registry.get_table("people").unwrap();
        assert_eq!(
            people.get_column("talisman").unwrap().references.as_deref(),
            Some("kinds")
        );
    }

    #[test]
    fn test_replace_onto_existing_table() {
        let mut registry = registry();
        let mut renamed = registry.get_table("species").unwrap().clone();
        renamed.name = "people".to_string();
        let result = registry.replace("species", renamed);
        assert!(matches!(result, Err(MigrateError::TableExists(_))));
        assert!(registry.contains("species"));
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut registry = registry();
        let renamed = TableState::new("kinds", vec![Column::identity("id")]).unwrap();
        registry.replace("species", renamed).unwrap();

        let names: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["kinds", "people"]);
        let people = registry.get_table("people").unwrap();
        assert_eq!(
            people.get_column("talisman").unwrap().references.as_deref(),
            Some("kinds")
        );
    }

    #[test]
    fn test_remove_missing_table() {
        let mut registry = registry();
        assert!(registry.remove("planets").is_err());
        assert!(registry.remove("people").is_ok());
        assert_eq!(registry.iter().count(), 1);
    }
}

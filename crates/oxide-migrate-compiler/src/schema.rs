//! Schema representation types.
//!
//! These types describe what a table looks like at a given point of the
//! migration sequence. The registry keeps one [`TableState`] per table and the
//! planner works on scratch copies of them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Column types understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Auto-incrementing integer primary key.
    Identity,
    /// Integer.
    Integer,
    /// Text.
    Text,
    /// Floating point.
    Real,
    /// Binary large object.
    Blob,
    /// Integer reference to another table's `id`.
    Foreign,
}

impl ColumnType {
    /// Returns the SQL type keyword.
    #[must_use]
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Identity | Self::Integer | Self::Foreign => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }
}

/// A literal used for column defaults and rebuild fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Boolean, stored by SQLite as 0/1.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Float.
    Real(f64),
    /// String.
    Text(String),
}

impl Literal {
    /// Returns the SQL representation of this literal.
    ///
    /// SQLite has no literal for NaN or infinity; those render as `NULL`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) if !f.is_finite() => "NULL".to_string(),
            Self::Real(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether this column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Whether the column rejects NULL values.
    #[serde(default)]
    pub not_null: bool,
    /// Whether this column takes part in the table's UNIQUE clause.
    #[serde(default)]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Literal>,
    /// Referenced table for foreign columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl Column {
    /// Creates a new nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            unique: false,
            default: None,
            references: None,
        }
    }

    /// Creates an identity column.
    #[must_use]
    pub fn identity(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Identity)
    }

    /// Creates an integer column.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    /// Creates a text column.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Creates a real column.
    #[must_use]
    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    /// Creates a blob column.
    #[must_use]
    pub fn blob(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Blob)
    }

    /// Creates a foreign column referencing `table`.
    #[must_use]
    pub fn foreign(name: impl Into<String>, table: impl Into<String>) -> Self {
        let mut column = Self::new(name, ColumnType::Foreign);
        column.references = Some(table.into());
        column
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Literal>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns true for identity columns.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.column_type == ColumnType::Identity
    }

    /// Returns true for foreign columns.
    #[must_use]
    pub fn is_foreign(&self) -> bool {
        self.column_type == ColumnType::Foreign
    }
}

/// Copy instructions consumed by the next rebuild of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnParams {
    /// Column of the source table to read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_from: Option<String>,
    /// Fallback used when the source value is NULL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coalesce: Option<Literal>,
}

impl ColumnParams {
    /// Creates empty params.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the column's data from `column` when the table is rebuilt.
    #[must_use]
    pub fn fill_from(mut self, column: impl Into<String>) -> Self {
        self.fill_from = Some(column.into());
        self
    }

    /// Wraps the copied value in `COALESCE(.., value)`.
    #[must_use]
    pub fn coalesce(mut self, value: impl Into<Literal>) -> Self {
        self.coalesce = Some(value.into());
        self
    }
}

/// Tracked state of a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Pending copy params, keyed by column name.
    pub params: HashMap<String, ColumnParams>,
    /// Columns renamed in the batch being planned: new name -> name in the stored table.
    pub renamed_from: HashMap<String, String>,
    /// Columns added in the batch being planned; they have no data to copy.
    pub added: HashSet<String>,
}

impl TableState {
    /// Creates a table state, rejecting duplicate column names.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        for (idx, column) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(MigrateError::column_exists(&name, &column.name));
            }
        }
        Ok(Self {
            name,
            columns,
            params: HashMap::new(),
            renamed_from: HashMap::new(),
            added: HashSet::new(),
        })
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets a mutable column by name.
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Returns the column's name in the stored table, following renames.
    #[must_use]
    pub fn source_name<'a>(&'a self, column: &'a str) -> &'a str {
        self.renamed_from.get(column).map_or(column, String::as_str)
    }

    /// Appends a column.
    pub fn add_column(&mut self, column: Column, params: Option<ColumnParams>) -> Result<()> {
        if self.get_column(&column.name).is_some() {
            return Err(MigrateError::column_exists(&self.name, &column.name));
        }
        if let Some(params) = params {
            self.params.insert(column.name.clone(), params);
        }
        self.added.insert(column.name.clone());
        self.columns.push(column);
        Ok(())
    }

    /// Replaces a column definition and/or its params, keeping its position.
    pub fn change_column(
        &mut self,
        name: &str,
        column: Option<Column>,
        params: Option<ColumnParams>,
    ) -> Result<()> {
        let table = self.name.clone();
        let existing = self
            .get_column_mut(name)
            .ok_or_else(|| MigrateError::column_not_found(&table, name))?;
        if let Some(mut column) = column {
            column.name = name.to_string();
            *existing = column;
        }
        if let Some(params) = params {
            self.params.insert(name.to_string(), params);
        }
        Ok(())
    }

    /// Removes a column and returns its definition.
    pub fn drop_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| MigrateError::column_not_found(&self.name, name))?;
        self.params.remove(name);
        self.renamed_from.remove(name);
        self.added.remove(name);
        Ok(self.columns.remove(idx))
    }

    /// Renames a column in place, recording where its data lives.
    pub fn rename_column(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.get_column(new_name).is_some() {
            return Err(MigrateError::column_exists(&self.name, new_name));
        }
        let table = self.name.clone();
        let column = self
            .get_column_mut(old_name)
            .ok_or_else(|| MigrateError::column_not_found(&table, old_name))?;
        column.name = new_name.to_string();

        if let Some(params) = self.params.remove(old_name) {
            self.params.insert(new_name.to_string(), params);
        }
        if self.added.remove(old_name) {
            self.added.insert(new_name.to_string());
        } else {
            let source = self
                .renamed_from
                .remove(old_name)
                .unwrap_or_else(|| old_name.to_string());
            self.renamed_from.insert(new_name.to_string(), source);
        }
        Ok(())
    }

    /// Forgets which columns were added or renamed in the planned batch.
    pub fn clear_history(&mut self) {
        self.renamed_from.clear();
        self.added.clear();
    }

    /// Points foreign columns referencing `old_name` at `new_name`.
    pub fn retarget_references(&mut self, old_name: &str, new_name: &str) {
        for column in &mut self.columns {
            if column.is_foreign() && column.references.as_deref() == Some(old_name) {
                column.references = Some(new_name.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species() -> TableState {
        TableState::new(
            "species",
            vec![
                Column::identity("id"),
                Column::text("name").not_null().default("Unnamed species"),
                Column::text("origin"),
                Column::integer("population"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_literal_sql() {
        assert_eq!(Literal::from("Earth").to_sql(), "'Earth'");
        assert_eq!(Literal::from("it's").to_sql(), "'it''s'");
        assert_eq!(Literal::from(1).to_sql(), "1");
        assert_eq!(Literal::from(2.5).to_sql(), "2.5");
        assert_eq!(Literal::from(true).to_sql(), "1");
        assert_eq!(Literal::from(f64::NAN).to_sql(), "NULL");
        assert_eq!(Literal::from(f64::INFINITY).to_sql(), "NULL");
        assert_eq!(Literal::from(f64::NEG_INFINITY).to_sql(), "NULL");
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = TableState::new("t", vec![Column::text("a"), Column::integer("a")]);
        assert!(matches!(result, Err(MigrateError::ColumnExists { .. })));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut table = species();
        table.rename_column("origin", "place_of_origin").unwrap();

        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "place_of_origin", "population"]);
        assert_eq!(table.source_name("place_of_origin"), "origin");
    }

    #[test]
    fn test_chained_rename_tracks_source() {
        let mut table = species();
        table.rename_column("origin", "homeworld").unwrap();
        table.rename_column("homeworld", "home").unwrap();

        assert_eq!(table.source_name("home"), "origin");
        assert!(!table.renamed_from.contains_key("homeworld"));
    }

    #[test]
    fn test_added_column_rename_is_not_a_copy_source() {
        let mut table = species();
        table.add_column(Column::text("notes"), None).unwrap();
        table.rename_column("notes", "remarks").unwrap();

        assert!(table.added.contains("remarks"));
        assert!(!table.renamed_from.contains_key("remarks"));

        table.clear_history();
        assert!(table.added.is_empty());
    }

    #[test]
    fn test_rename_onto_existing_column() {
        let mut table = species();
        let result = table.rename_column("origin", "name");
        assert!(matches!(result, Err(MigrateError::ColumnExists { .. })));
    }

    #[test]
    fn test_change_column_keeps_name() {
        let mut table = species();
        table
            .change_column("origin", Some(Column::integer("ignored").not_null()), None)
            .unwrap();

        let origin = table.get_column("origin").unwrap();
        assert_eq!(origin.column_type, ColumnType::Integer);
        assert!(origin.not_null);
    }

    #[test]
    fn test_drop_missing_column() {
        let mut table = species();
        let result = table.drop_column("deprecated");
        assert!(matches!(result, Err(MigrateError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_column_serde() {
        let json = r#"{"name": "talisman", "type": "foreign", "references": "species"}"#;
        let column: Column = serde_json::from_str(json).unwrap();
        assert_eq!(column, Column::foreign("talisman", "species"));

        let json = r#"{"name": "origin", "type": "text", "default": "Earth"}"#;
        let column: Column = serde_json::from_str(json).unwrap();
        assert_eq!(column.default, Some(Literal::Text("Earth".into())));
    }
}

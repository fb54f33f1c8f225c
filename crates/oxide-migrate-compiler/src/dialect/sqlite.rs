//! SQLite dialect for migrations.
//!
//! SQLite has limited ALTER TABLE support, so some operations require
//! the "table recreation" strategy: create a new table, copy data,
//! drop the old table, rename the new table.

use crate::schema::{Column, ColumnType, TableState};

use super::{Capability, DialectVersion, MigrationDialect};

/// Suffix of the scratch table used while recreating a table.
pub const TEMP_TABLE_SUFFIX: &str = "_tmp";

const THRESHOLDS: &[(Capability, DialectVersion)] = &[
    (Capability::DropColumn, DialectVersion::new(3, 35, 0)),
    (Capability::RenameColumn, DialectVersion::new(3, 25, 0)),
    (Capability::RenameTable, DialectVersion::new(3, 25, 0)),
];

/// SQLite migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generates a single column definition.
    ///
    /// Identity and foreign columns ignore their flags: identity is always
    /// `INTEGER PRIMARY KEY AUTOINCREMENT` and foreign keys are emitted as
    /// table-level clauses.
    #[must_use]
    pub fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote_identifier(&column.name)];

        match column.column_type {
            ColumnType::Identity => parts.push("INTEGER PRIMARY KEY AUTOINCREMENT".to_string()),
            ColumnType::Foreign => parts.push(column.column_type.sql_name().to_string()),
            _ => {
                parts.push(column.column_type.sql_name().to_string());
                if column.auto_increment {
                    parts.push("AUTOINCREMENT".to_string());
                }
                if column.not_null {
                    parts.push("NOT NULL".to_string());
                }
                if let Some(default) = &column.default {
                    parts.push(format!("DEFAULT {}", default.to_sql()));
                }
            }
        }

        parts.join(" ")
    }

    /// Generates SQL for creating a table.
    #[must_use]
    pub fn create_table_sql(&self, name: &str, columns: &[Column]) -> String {
        let mut defs: Vec<String> = columns.iter().map(|c| self.column_definition(c)).collect();

        let primary_key = self.quoted_list(
            columns
                .iter()
                .filter(|c| c.primary_key && !c.is_identity()),
        );
        if !primary_key.is_empty() {
            defs.push(format!("PRIMARY KEY({primary_key})"));
        }

        let unique = self.quoted_list(columns.iter().filter(|c| c.unique));
        if !unique.is_empty() {
            defs.push(format!("UNIQUE({unique})"));
        }

        for column in columns.iter().filter(|c| c.is_foreign()) {
            if let Some(target) = &column.references {
                defs.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {}(\"id\")",
                    self.quote_identifier(&column.name),
                    self.quote_identifier(target)
                ));
            }
        }

        format!(
            "CREATE TABLE {} ({});",
            self.quote_identifier(name),
            defs.join(", ")
        )
    }

    /// Generates SQL for dropping a table.
    #[must_use]
    pub fn drop_table_sql(&self, name: &str) -> String {
        format!("DROP TABLE {};", self.quote_identifier(name))
    }

    /// Generates SQL for renaming a table.
    #[must_use]
    pub fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {};",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for adding a column.
    ///
    /// `ADD COLUMN` cannot carry table constraints, so foreign columns get an
    /// inline `REFERENCES` clause.
    #[must_use]
    pub fn add_column_sql(&self, table: &str, column: &Column) -> String {
        let mut definition = self.column_definition(column);
        if let Some(target) = column.references.as_ref().filter(|_| column.is_foreign()) {
            definition.push_str(&format!(
                " REFERENCES {}(\"id\")",
                self.quote_identifier(target)
            ));
        }
        format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote_identifier(table),
            definition
        )
    }

    /// Generates SQL for dropping a column (SQLite 3.35.0+).
    #[must_use]
    pub fn drop_column_sql(&self, table: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {};",
            self.quote_identifier(table),
            self.quote_identifier(column_name)
        )
    }

    /// Generates SQL for renaming a column (SQLite 3.25.0+).
    #[must_use]
    pub fn rename_column_sql(&self, table: &str, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            self.quote_identifier(table),
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates the four statements that rebuild `source` as `target`.
    ///
    /// Data is copied column by column: a `coalesce` param wraps the source in
    /// `COALESCE`, a column renamed since the last rebuild reads its old name,
    /// and `fill_from` redirects the read to another source column. Columns
    /// added in the batch with nothing to read are left to their default.
    #[must_use]
    pub fn recreate_table_sql(&self, source: &str, target: &TableState) -> Vec<String> {
        let temp = format!("{}{TEMP_TABLE_SUFFIX}", target.name);

        let mut into = Vec::with_capacity(target.columns.len());
        let mut select = Vec::with_capacity(target.columns.len());
        for column in &target.columns {
            if let Some(expr) = self.copy_expression(target, &column.name) {
                into.push(self.quote_identifier(&column.name));
                select.push(expr);
            }
        }

        vec![
            self.create_table_sql(&temp, &target.columns),
            format!(
                "INSERT INTO {} ({}) SELECT {} FROM {};",
                self.quote_identifier(&temp),
                into.join(", "),
                select.join(", "),
                self.quote_identifier(source)
            ),
            self.drop_table_sql(source),
            self.rename_table_sql(&temp, &target.name),
        ]
    }

    fn copy_expression(&self, target: &TableState, column: &str) -> Option<String> {
        let params = target.params.get(column);
        let fill_from = params.and_then(|p| p.fill_from.as_deref());
        let coalesce = params.and_then(|p| p.coalesce.as_ref());

        if target.added.contains(column) {
            return match (fill_from, coalesce) {
                (Some(from), Some(fallback)) => Some(format!(
                    "COALESCE({}, {})",
                    self.quote_identifier(from),
                    fallback.to_sql()
                )),
                (Some(from), None) => Some(self.quote_identifier(from)),
                (None, Some(fallback)) => Some(fallback.to_sql()),
                (None, None) => None,
            };
        }

        let source = target.source_name(column);
        Some(match coalesce {
            Some(fallback) => format!(
                "COALESCE({}, {})",
                self.quote_identifier(fill_from.unwrap_or(source)),
                fallback.to_sql()
            ),
            None if target.renamed_from.contains_key(column) => self.quote_identifier(source),
            None => self.quote_identifier(fill_from.unwrap_or(column)),
        })
    }

    fn quoted_list<'a>(&self, columns: impl Iterator<Item = &'a Column>) -> String {
        columns
            .map(|c| self.quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl MigrationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn capability_thresholds(&self) -> &'static [(Capability, DialectVersion)] {
        THRESHOLDS
    }
}

//! Units of compiled output.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// A positional value bound to a SQL step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Float.
    Real(f64),
    /// Text.
    Text(String),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Callback run by the executor in place of a SQL statement.
pub type Script = Arc<dyn Fn() + Send + Sync>;

/// Asynchronous variant of [`Script`].
pub type AsyncScript = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// One step of a migration.
#[derive(Clone)]
pub enum MigrationStep {
    /// A SQL statement with positional values.
    Sql {
        /// Statement text.
        query: String,
        /// Values bound to `?` placeholders.
        values: Vec<QueryValue>,
    },
    /// A synchronous script.
    Script(Script),
    /// An asynchronous script.
    AsyncScript(AsyncScript),
}

impl MigrationStep {
    /// Creates a SQL step without values.
    #[must_use]
    pub fn sql(query: impl Into<String>) -> Self {
        Self::Sql {
            query: query.into(),
            values: Vec::new(),
        }
    }

    /// Creates a SQL step with values.
    #[must_use]
    pub fn sql_with_values(query: impl Into<String>, values: Vec<QueryValue>) -> Self {
        Self::Sql {
            query: query.into(),
            values,
        }
    }

    /// Returns the statement text of a SQL step.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Sql { query, .. } => Some(query),
            Self::Script(_) | Self::AsyncScript(_) => None,
        }
    }

    /// Returns the bound values of a SQL step.
    #[must_use]
    pub fn values(&self) -> &[QueryValue] {
        match self {
            Self::Sql { values, .. } => values,
            Self::Script(_) | Self::AsyncScript(_) => &[],
        }
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql { query, values } => f
                .debug_struct("Sql")
                .field("query", query)
                .field("values", values)
                .finish(),
            Self::Script(_) => f.write_str("Script(..)"),
            Self::AsyncScript(_) => f.write_str("AsyncScript(..)"),
        }
    }
}

/// A numbered migration and its steps.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration ID, as stored in the tracking table.
    pub id: i64,
    /// Steps in declaration order; the first is the tracking INSERT.
    pub steps: Vec<MigrationStep>,
}

impl Migration {
    /// Creates an empty migration.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            steps: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_value_json() {
        let values = vec![
            QueryValue::from(3),
            QueryValue::from("1.2.0"),
            QueryValue::from(None::<i64>),
            QueryValue::from(true),
        ];
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[3,"1.2.0",null,true]"#
        );
    }

    #[test]
    fn test_step_accessors() {
        let step = MigrationStep::sql_with_values("DELETE FROM \"species\" WHERE \"id\" = ?;", vec![7.into()]);
        assert_eq!(step.query(), Some("DELETE FROM \"species\" WHERE \"id\" = ?;"));
        assert_eq!(step.values(), &[QueryValue::Integer(7)]);

        let script = MigrationStep::Script(Arc::new(|| {}));
        assert!(script.query().is_none());
        assert!(script.values().is_empty());
        assert_eq!(format!("{script:?}"), "Script(..)");
    }
}

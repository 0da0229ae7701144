//! Collection filters lowered to SQL over JSON document bodies.
//!
//! # Invariants
//! - Field names are static identifiers declared by typed entity filters;
//!   they are rendered into JSON paths, never taken from caller input.
//! - Values are always bound as parameters.

use rusqlite::types::Value;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Scalar compared against a JSON body field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
}

impl FilterValue {
    /// SQLite bind value matching what `json_extract` yields for this scalar.
    pub(crate) fn to_sql(&self) -> Value {
        match self {
            Self::Text(value) => Value::Text(value.clone()),
            Self::Integer(value) => Value::Integer(*value),
            Self::Real(value) => Value::Real(*value),
            Self::Bool(value) => Value::Integer(i64::from(*value)),
        }
    }
}

impl Display for FilterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One predicate on a top-level body field.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    /// Field equals value.
    Eq(&'static str, FilterValue),
    /// Array field contains value.
    Contains(&'static str, FilterValue),
}

/// Conjunction of conditions over one collection.
///
/// Soft-deleted documents are excluded unless `include_deleted` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
    include_deleted: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field = value`.
    pub fn eq(mut self, field: &'static str, value: impl Into<FilterValue>) -> Self {
        self.conditions.push(Condition::Eq(field, value.into()));
        self
    }

    /// Adds `field = value` when `value` is present.
    pub fn eq_opt<V: Into<FilterValue>>(self, field: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    /// Adds "array `field` contains `value`" when `value` is present.
    pub fn contains_opt<V: Into<FilterValue>>(
        mut self,
        field: &'static str,
        value: Option<V>,
    ) -> Self {
        if let Some(value) = value {
            self.conditions
                .push(Condition::Contains(field, value.into()));
        }
        self
    }

    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    /// Renders the `WHERE` clause (without the keyword) and its bind values.
    pub(crate) fn to_sql(&self, collection: &str) -> (String, Vec<Value>) {
        let mut sql = String::from("collection = ?");
        let mut binds = vec![Value::Text(collection.to_string())];

        if !self.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }

        for condition in &self.conditions {
            match condition {
                Condition::Eq(field, value) => {
                    sql.push_str(&format!(" AND json_extract(body, {}) = ?", json_path(field)));
                    binds.push(value.to_sql());
                }
                Condition::Contains(field, value) => {
                    sql.push_str(&format!(
                        " AND EXISTS (SELECT 1 FROM json_each(documents.body, {}) AS item WHERE item.value = ?)",
                        json_path(field)
                    ));
                    binds.push(value.to_sql());
                }
            }
        }

        (sql, binds)
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (index, condition) in self.conditions.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            match condition {
                Condition::Eq(field, value) => write!(f, "{field}: {value}")?,
                Condition::Contains(field, value) => write!(f, "{field} contains {value}")?,
            }
        }
        if self.include_deleted {
            if !self.conditions.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "includeDeleted: true")?;
        }
        write!(f, "}}")
    }
}

fn json_path(field: &str) -> String {
    debug_assert!(
        field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
        "filter field must be a plain identifier: {field}"
    );
    format!("'$.{field}'")
}

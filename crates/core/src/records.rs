//! In-memory record table the engine evaluates against.
//!
//! Rows are flat JSON objects. The column set is tracked separately so that a
//! field can be "present in the record set" even when individual rows omit
//! it; an omitted key reads as `null`.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::CoreError;
use crate::types::Record;

static NULL: Value = Value::Null;

/// Ordered, read-only collection of records plus their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl RecordSet {
    /// Build a record set whose columns are the union of the row keys, in
    /// first-seen order.
    pub fn new(rows: Vec<Record>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Parse a JSON array of objects.
    pub fn from_json(value: Value) -> Result<Self, CoreError> {
        let Value::Array(items) = value else {
            return Err(CoreError::InvalidRecords(
                "expected a JSON array of records".to_string(),
            ));
        };
        let rows = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(CoreError::InvalidRecords(format!(
                    "record {i} is not an object (got {})",
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rows))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`; missing keys read as `null`.
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.rows[row].get(column).unwrap_or(&NULL)
    }

    /// Iterate one column top to bottom.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |r| r.get(name).unwrap_or(&NULL))
    }

    /// Like [`column`](Self::column) but fails when the field is not part of
    /// the record set.
    pub fn require_column<'a>(
        &'a self,
        name: &'a str,
    ) -> Result<impl Iterator<Item = &'a Value> + 'a, CoreError> {
        if !self.has_column(name) {
            return Err(CoreError::missing_field(name));
        }
        Ok(self.column(name))
    }

    /// Return a copy with `f` applied to every value of the listed columns.
    pub fn map_columns<F>(&self, names: &[String], f: F) -> Self
    where
        F: Fn(&Value) -> Value,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                for name in names {
                    if let Some(v) = row.get_mut(name) {
                        *v = f(v);
                    }
                }
                row
            })
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

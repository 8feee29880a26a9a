//! Integer coercion of numeric fields before evaluation.

use serde_json::Value;

use crate::grid::rules::RuleGrid;
use crate::records::RecordSet;

/// Geographic coordinates keep their decimal precision.
pub const COORDINATE_FIELDS: &[&str] = &["latitud", "longitud"];

/// Fields to coerce: grid fields declared `int` plus fields among `fields`
/// whose non-null values are all numbers, minus coordinates.
pub fn numeric_fields(records: &RecordSet, grid: &RuleGrid, fields: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let declared = grid
        .int_fields()
        .filter(|f| fields.iter().any(|c| c == *f))
        .map(str::to_string);
    let inferred = fields
        .iter()
        .filter(|f| is_numeric_column(records, f))
        .cloned();

    for field in declared.chain(inferred) {
        if !COORDINATE_FIELDS.contains(&field.as_str()) && !out.contains(&field) {
            out.push(field);
        }
    }
    out
}

fn is_numeric_column(records: &RecordSet, field: &str) -> bool {
    let mut saw_number = false;
    for value in records.column(field) {
        match value {
            Value::Null => {}
            Value::Number(_) => saw_number = true,
            _ => return false,
        }
    }
    saw_number
}

/// Copy of `records` with `fields` floored to integers.
pub fn coerce_integers(records: &RecordSet, fields: &[String]) -> RecordSet {
    records.map_columns(fields, to_integer)
}

/// Best-effort integer: numbers and numeric text are floored, booleans become
/// 1/0, anything else becomes null.
pub fn to_integer(value: &Value) -> Value {
    let number = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Value::from(i);
            }
            n.as_f64()
        }
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match number.map(f64::floor) {
        Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Value::from(f as i64),
        _ => Value::Null,
    }
}

//! Value constraints: does a field's value satisfy its declared spec.

use std::borrow::Cow;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;
use crate::grid::rules::{is_allowed, AllowedValue, AllowedValues, ValueSpec, ValueType};
use crate::records::RecordSet;
use crate::types::Mask;

/// Evaluate `spec` for `field` on every record. `None` when the field has no
/// value constraint (only presence is checked downstream).
pub fn evaluate_values(
    spec: Option<&ValueSpec>,
    records: &RecordSet,
    field: &str,
) -> Result<Option<Mask>, CoreError> {
    let Some(spec) = spec else {
        return Ok(None);
    };
    let column = records.require_column(field)?;

    let mask = match (&spec.value_type, &spec.allowed_values) {
        (ValueType::Regex, AllowedValues::Pattern(pattern)) => {
            let re = anchored_regex(field, pattern)?;
            column.map(|v| re.is_match(&as_text(v))).collect()
        }
        (ValueType::Regex, AllowedValues::Values(_)) => {
            return Err(CoreError::malformed_rule(field, "regex spec needs a pattern"));
        }
        (_, AllowedValues::Pattern(_)) => {
            return Err(CoreError::malformed_rule(
                field,
                format!("'{}' spec needs a list of allowed values", spec.value_type),
            ));
        }
        (ValueType::List, AllowedValues::Values(allowed)) => {
            column.map(|v| all_allowed(allowed, v)).collect()
        }
        (ValueType::ListList, AllowedValues::Values(allowed)) => column
            .map(|v| match v {
                Value::Array(inner) => inner.iter().all(|i| all_allowed(allowed, i)),
                _ => false,
            })
            .collect(),
        (_, AllowedValues::Values(allowed)) => column.map(|v| is_allowed(allowed, v)).collect(),
    };

    Ok(Some(mask))
}

/// Compile `pattern` so that it only matches at the start of the text.
fn anchored_regex(field: &str, pattern: &str) -> Result<Regex, CoreError> {
    Regex::new(&format!("^(?:{pattern})"))
        .map_err(|e| CoreError::malformed_rule(field, format!("invalid pattern: {e}")))
}

/// Every element of a sequence is allowed; anything that is not a sequence
/// fails.
fn all_allowed(allowed: &[AllowedValue], value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|item| is_allowed(allowed, item)),
        _ => false,
    }
}

/// Text form of a value for pattern matching.
fn as_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

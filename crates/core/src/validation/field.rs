//! Per-field error flags.

use crate::error::CoreError;
use crate::grid::rules::RuleEntry;
use crate::records::RecordSet;
use crate::types::Flags;

use super::condition::evaluate_condition;
use super::values::evaluate_values;

/// Combine an applicability mask and a value mask into 0/1 error flags.
///
/// Records outside the applicable subset are never flagged. Inside it, a
/// record is flagged when its value is null or fails the value constraint.
pub fn validate_field(
    condition: Option<&[bool]>,
    values: Option<&[bool]>,
    field: &str,
    records: &RecordSet,
) -> Result<Flags, CoreError> {
    check_len(field, condition, records.len(), "condition")?;
    check_len(field, values, records.len(), "value")?;
    let column = records
        .require_column(field)
        .map_err(|e| CoreError::for_field(field, e))?;

    Ok(column
        .enumerate()
        .map(|(i, value)| {
            let applicable = condition.map_or(true, |c| c[i]);
            let invalid = value.is_null() || values.is_some_and(|v| !v[i]);
            u8::from(applicable && invalid)
        })
        .collect())
}

/// Run applicability, value and flag evaluation for one field. Any failure is
/// reported as [`CoreError::FieldValidation`].
pub fn evaluate_field(field: &str, entry: &RuleEntry, records: &RecordSet) -> Result<Flags, CoreError> {
    let condition = evaluate_condition(
        entry.condition.as_ref(),
        records,
        entry.combine_and,
        entry.excluded_from_general,
    )
    .map_err(|e| CoreError::for_field(field, e))?;
    let values = evaluate_values(entry.value_spec.as_ref(), records, field)
        .map_err(|e| CoreError::for_field(field, e))?;

    validate_field(condition.as_deref(), values.as_deref(), field, records)
}

fn check_len(field: &str, mask: Option<&[bool]>, expected: usize, kind: &str) -> Result<(), CoreError> {
    match mask {
        Some(m) if m.len() != expected => Err(CoreError::for_field(
            field,
            CoreError::Internal(format!(
                "{kind} mask has {} entries for {expected} records",
                m.len()
            )),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::rules::{AllowedValue, AllowedValues, Condition, ValueSpec, ValueType};
    use crate::types::Record;
    use assert_matches::assert_matches;
    use serde_json::{json, Value};

    fn records(rows: Value) -> RecordSet {
        let rows: Vec<Record> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect();
        RecordSet::new(rows)
    }

    fn entry() -> RuleEntry {
        RuleEntry {
            condition: None,
            combine_and: false,
            excluded_from_general: true,
            value_spec: None,
            mandatory: true,
        }
    }

    #[test]
    fn presence_only_flags_nulls() {
        let set = records(json!([{"P1": 1}, {"P1": null}, {"P2": 1}]));
        let flags = validate_field(None, None, "P1", &set).unwrap();
        assert_eq!(flags, vec![0, 1, 1]);
    }

    #[test]
    fn records_outside_condition_are_never_flagged() {
        let set = records(json!([{"P1": null}, {"P1": null}, {"P1": "X"}]));
        let condition = [true, false, false];
        let values = [false, false, false];
        let flags = validate_field(Some(&condition[..]), Some(&values[..]), "P1", &set).unwrap();
        assert_eq!(flags, vec![1, 0, 0]);
    }

    #[test]
    fn failing_value_is_flagged() {
        let set = records(json!([{"P1": "A"}, {"P1": "B"}]));
        let values = [true, false];
        let flags = validate_field(None, Some(&values[..]), "P1", &set).unwrap();
        assert_eq!(flags, vec![0, 1]);
    }

    #[test]
    fn mask_length_mismatch_is_field_validation_error() {
        let set = records(json!([{"P1": "A"}]));
        let err = validate_field(Some(&[true, true][..]), None, "P1", &set).unwrap_err();
        assert_matches!(err, CoreError::FieldValidation { field, .. } if field == "P1");
    }

    #[test]
    fn evaluate_field_runs_the_whole_chain() {
        let set = records(json!([
            {"P1": 1, "P2": "NO"},
            {"P1": 1, "P2": null},
            {"P1": 2, "P2": null}
        ]));
        let mut e = entry();
        e.condition = Some(Condition::from([("P1".to_string(), vec![AllowedValue::Int(1)])]));
        e.value_spec = Some(ValueSpec {
            allowed_values: AllowedValues::Values(vec![AllowedValue::Str("SI".into())]),
            value_type: ValueType::Str,
        });
        assert_eq!(evaluate_field("P2", &e, &set).unwrap(), vec![1, 1, 0]);
    }

    #[test]
    fn evaluate_field_wraps_missing_dependency() {
        let set = records(json!([{"P2": 1}]));
        let mut e = entry();
        e.condition = Some(Condition::from([("P9".to_string(), vec![AllowedValue::Int(1)])]));
        let err = evaluate_field("P2", &e, &set).unwrap_err();
        assert_matches!(
            err,
            CoreError::FieldValidation { ref field, ref source }
                if field == "P2" && matches!(**source, CoreError::MissingField { .. })
        );
    }
}

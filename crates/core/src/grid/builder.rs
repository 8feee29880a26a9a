//! Builds a [`RuleGrid`] from the raw conditions and values tables.

use std::collections::HashMap;

use super::rules::{AllowedValue, AllowedValues, Condition, RuleEntry, RuleGrid, ValueSpec, ValueType};
use super::tables::{
    RuleTable, COL_COMBINE_AND, COL_CONDITION, COL_CONDITION_TYPE, COL_DEPENDENT, COL_EXCLUDED,
    COL_FIELD, COL_OPTIONAL, COL_VALUES, COL_VALUE_TYPE,
};
use crate::error::CoreError;

/// Separator of multi-valued cells.
pub const CELL_SEPARATOR: char = '|';

/// Join the conditions table with the values table and fold the rows into one
/// entry per field.
///
/// Values rows with a blank `valores` cell are ignored. A field without a
/// values row has no value constraint; when several values rows exist for a
/// field the first one is used.
pub fn build_rule_grid(conditions: &RuleTable, values: &RuleTable) -> Result<RuleGrid, CoreError> {
    let value_specs = collect_value_specs(values)?;

    let field = conditions.column_index(COL_FIELD)?;
    let dependent = conditions.column_index(COL_DEPENDENT)?;
    let condition = conditions.column_index(COL_CONDITION)?;
    let condition_type = conditions.column_index(COL_CONDITION_TYPE)?;
    let combine_and = conditions.column_index(COL_COMBINE_AND)?;
    let optional = conditions.column_index(COL_OPTIONAL)?;
    let excluded = conditions.column_index(COL_EXCLUDED)?;

    let mut entries: indexmap::IndexMap<String, RuleEntry> = indexmap::IndexMap::new();

    for row in 0..conditions.row_count() {
        let name = conditions.cell(row, field).ok_or_else(|| {
            CoreError::MalformedRuleSource(format!(
                "conditions row {} has no '{COL_FIELD}'",
                row + 1
            ))
        })?;

        let dependent_term = match conditions.cell(row, dependent) {
            Some(dep) => {
                let allowed = match conditions.cell(row, condition) {
                    Some(raw) => parse_list(raw, conditions.cell(row, condition_type))
                        .map_err(|e| cell_error("conditions", row, COL_CONDITION, e))?,
                    None => Vec::new(),
                };
                Some((dep.to_string(), allowed))
            }
            None => None,
        };

        if let Some(entry) = entries.get_mut(name) {
            if let Some((dep, allowed)) = dependent_term {
                entry
                    .condition
                    .get_or_insert_with(Condition::new)
                    .insert(dep, allowed);
            }
            continue;
        }

        let entry = RuleEntry {
            condition: dependent_term.map(|(dep, allowed)| Condition::from([(dep, allowed)])),
            combine_and: conditions.cell(row, combine_and).is_some(),
            excluded_from_general: conditions.cell(row, excluded).is_some(),
            value_spec: value_specs.get(name).cloned(),
            mandatory: conditions.cell(row, optional).is_none(),
        };
        entries.insert(name.to_string(), entry);
    }

    Ok(entries.into_iter().collect())
}

fn collect_value_specs(values: &RuleTable) -> Result<HashMap<String, ValueSpec>, CoreError> {
    let field = values.column_index(COL_FIELD)?;
    let raw_values = values.column_index(COL_VALUES)?;
    let value_type = values.column_index(COL_VALUE_TYPE)?;

    let mut specs = HashMap::new();
    for row in 0..values.row_count() {
        let Some(raw) = values.cell(row, raw_values) else {
            continue;
        };
        let name = values.cell(row, field).ok_or_else(|| {
            CoreError::MalformedRuleSource(format!("values row {} has no '{COL_FIELD}'", row + 1))
        })?;
        let Some(ty) = values.cell(row, value_type) else {
            continue;
        };
        if specs.contains_key(name) {
            continue;
        }

        let value_type = ValueType::parse(ty);
        let allowed_values = match value_type {
            ValueType::Regex => AllowedValues::Pattern(raw.to_string()),
            _ => AllowedValues::Values(
                parse_list(raw, Some(ty)).map_err(|e| cell_error("values", row, COL_VALUES, e))?,
            ),
        };
        specs.insert(
            name.to_string(),
            ValueSpec {
                allowed_values,
                value_type,
            },
        );
    }
    Ok(specs)
}

/// Split a pipe-delimited cell into typed values: integers when the declared
/// type is `int`, strings otherwise.
pub fn parse_list(raw: &str, declared: Option<&str>) -> Result<Vec<AllowedValue>, String> {
    let as_int = declared.map(str::trim) == Some("int");
    raw.split(CELL_SEPARATOR)
        .map(str::trim)
        .map(|piece| {
            if as_int {
                parse_int(piece).map(AllowedValue::Int)
            } else {
                Ok(AllowedValue::Str(piece.to_string()))
            }
        })
        .collect()
}

/// Integer text, also accepting integral decimals such as `3.0` as spreadsheet
/// exports write them.
fn parse_int(piece: &str) -> Result<i64, String> {
    if let Ok(n) = piece.parse::<i64>() {
        return Ok(n);
    }
    match piece.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(format!("'{piece}' is not an integer")),
    }
}

fn cell_error(table: &str, row: usize, column: &str, reason: String) -> CoreError {
    CoreError::MalformedRuleSource(format!(
        "{table} row {}, column '{column}': {reason}",
        row + 1
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const CONDITION_HEADERS: &[&str] = &[
        COL_FIELD,
        COL_DEPENDENT,
        COL_CONDITION,
        COL_CONDITION_TYPE,
        COL_COMBINE_AND,
        COL_OPTIONAL,
        COL_EXCLUDED,
    ];
    const VALUE_HEADERS: &[&str] = &[COL_FIELD, COL_VALUES, COL_VALUE_TYPE];

    fn conditions(rows: &[&[&str]]) -> RuleTable {
        RuleTable::from_strs(CONDITION_HEADERS, rows)
    }

    fn values(rows: &[&[&str]]) -> RuleTable {
        RuleTable::from_strs(VALUE_HEADERS, rows)
    }

    #[test]
    fn blank_markers_use_defaults() {
        let grid = build_rule_grid(&conditions(&[&["P1", "", "", "", "", "", ""]]), &values(&[]))
            .unwrap();
        let entry = grid.get("P1").unwrap();
        assert_eq!(entry.condition, None);
        assert_eq!(entry.value_spec, None);
        assert!(!entry.combine_and);
        assert!(entry.mandatory);
        assert!(!entry.excluded_from_general);
    }

    #[test]
    fn filled_markers_flip_defaults() {
        let grid = build_rule_grid(&conditions(&[&["P1", "", "", "", "x", "x", "x"]]), &values(&[]))
            .unwrap();
        let entry = grid.get("P1").unwrap();
        assert!(entry.combine_and);
        assert!(!entry.mandatory);
        assert!(entry.excluded_from_general);
    }

    #[test]
    fn repeated_rows_merge_dependent_conditions() {
        let grid = build_rule_grid(
            &conditions(&[
                &["P3", "P1", "1|2", "int", "x", "", ""],
                &["P3", "P2", "SI", "str", "", "", ""],
            ]),
            &values(&[]),
        )
        .unwrap();
        assert_eq!(grid.len(), 1);
        let condition = grid.get("P3").unwrap().condition.as_ref().unwrap();
        assert_eq!(
            condition.get("P1").unwrap(),
            &vec![AllowedValue::Int(1), AllowedValue::Int(2)]
        );
        assert_eq!(
            condition.get("P2").unwrap(),
            &vec![AllowedValue::Str("SI".into())]
        );
        assert!(grid.get("P3").unwrap().combine_and);
    }

    #[test]
    fn later_row_adds_condition_to_unconditioned_entry() {
        let grid = build_rule_grid(
            &conditions(&[
                &["P3", "", "", "", "", "", ""],
                &["P3", "P1", "1", "int", "", "", ""],
            ]),
            &values(&[]),
        )
        .unwrap();
        let condition = grid.get("P3").unwrap().condition.as_ref().unwrap();
        assert_eq!(condition.len(), 1);
    }

    #[test]
    fn value_specs_are_joined_by_field() {
        let grid = build_rule_grid(
            &conditions(&[
                &["EDAD", "", "", "", "", "", ""],
                &["CORREO", "", "", "", "", "x", ""],
                &["CULTIVOS", "", "", "", "", "", ""],
            ]),
            &values(&[
                &["EDAD", "1|2|3.0", "int"],
                &["CORREO", "^[a-z]+@", "regex"],
                &["CULTIVOS", "MAIZ|CAFE", "list"],
                &["SIN_CONDICION", "A", "str"],
            ]),
        )
        .unwrap();

        assert_eq!(grid.len(), 3);
        assert_eq!(
            grid.get("EDAD").unwrap().value_spec,
            Some(ValueSpec {
                allowed_values: AllowedValues::Values(vec![
                    AllowedValue::Int(1),
                    AllowedValue::Int(2),
                    AllowedValue::Int(3)
                ]),
                value_type: ValueType::Int,
            })
        );
        assert_eq!(
            grid.get("CORREO").unwrap().value_spec.as_ref().unwrap().allowed_values,
            AllowedValues::Pattern("^[a-z]+@".into())
        );
        assert_eq!(
            grid.get("CULTIVOS").unwrap().value_spec.as_ref().unwrap().value_type,
            ValueType::List
        );
    }

    #[test]
    fn values_rows_without_values_are_dropped() {
        let grid = build_rule_grid(
            &conditions(&[&["P1", "", "", "", "", "", ""]]),
            &values(&[&["P1", "", "str"]]),
        )
        .unwrap();
        assert_eq!(grid.get("P1").unwrap().value_spec, None);
    }

    #[test]
    fn unparseable_int_cell_is_malformed() {
        let err = build_rule_grid(
            &conditions(&[&["P3", "P1", "1|dos", "int", "", "", ""]]),
            &values(&[]),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::MalformedRuleSource(m) if m.contains("'dos'") && m.contains("row 1"));
    }

    #[test]
    fn missing_column_is_malformed() {
        let partial = RuleTable::from_strs(&[COL_FIELD, COL_DEPENDENT], &[]);
        let err = build_rule_grid(&partial, &values(&[])).unwrap_err();
        assert_matches!(err, CoreError::MalformedRuleSource(_));
    }

    #[test]
    fn blank_field_name_is_malformed() {
        let err = build_rule_grid(&conditions(&[&["", "", "", "", "", "", ""]]), &values(&[]))
            .unwrap_err();
        assert_matches!(err, CoreError::MalformedRuleSource(_));
    }

    #[test]
    fn blank_condition_with_dependent_gives_empty_allowed_set() {
        let grid = build_rule_grid(
            &conditions(&[&["P2", "P1", "", "", "", "", ""]]),
            &values(&[]),
        )
        .unwrap();
        assert_eq!(
            grid.get("P2").unwrap().condition,
            Some(Condition::from([("P1".to_string(), Vec::new())]))
        );
    }
}

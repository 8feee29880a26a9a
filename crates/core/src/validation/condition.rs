//! Applicability of a field: its dependent-field condition combined with the
//! general participation gate.

use serde_json::Value;

use crate::error::CoreError;
use crate::grid::rules::{is_allowed, AllowedValue, Condition};
use crate::records::RecordSet;
use crate::types::Mask;

/// "Wants to participate" field and its affirmative answer.
pub const PARTICIPATION_FIELD: &str = "DESEAPARTICIPAR";
pub const PARTICIPATION_AFFIRMATIVE: &str = "SI";
/// "Household has land" flag.
pub const LAND_FIELD: &str = "HOGAR_DISPONE_TIERRA";
/// "Household has water" flag.
pub const WATER_FIELD: &str = "HOGAR_DISPONE_AGUA";

/// Marks an age field when it appears anywhere in the name.
const AGE_MARKER: &str = "Edad";
/// Marks an age field when it is a whole `_`-separated token of the name.
const AGE_TOKEN: &str = "EDAD";

/// AND of the participation terms whose fields exist in the record set, or
/// `None` when none of them exist.
pub fn general_condition(records: &RecordSet) -> Option<Mask> {
    let mut terms: Vec<Mask> = Vec::new();

    if records.has_column(PARTICIPATION_FIELD) {
        terms.push(
            records
                .column(PARTICIPATION_FIELD)
                .map(|v| v.as_str() == Some(PARTICIPATION_AFFIRMATIVE))
                .collect(),
        );
    }
    for field in [LAND_FIELD, WATER_FIELD] {
        if records.has_column(field) {
            terms.push(records.column(field).map(is_affirmative_flag).collect());
        }
    }

    terms.into_iter().reduce(|acc, term| and(&acc, &term))
}

/// Evaluate whether a field applies to each record.
///
/// `None` means the field applies everywhere and no filtering happens
/// downstream. Every dependent-field term is evaluated and folded with AND or
/// OR according to `combine_and`.
pub fn evaluate_condition(
    condition: Option<&Condition>,
    records: &RecordSet,
    combine_and: bool,
    excluded_from_general: bool,
) -> Result<Option<Mask>, CoreError> {
    let general = || {
        if excluded_from_general {
            None
        } else {
            general_condition(records)
        }
    };

    let condition = match condition {
        Some(c) if !c.is_empty() => c,
        _ => return Ok(general()),
    };

    let mut combined: Option<Mask> = None;
    for (field, allowed) in condition {
        let term = dependent_term(field, allowed, records)?;
        combined = Some(match combined {
            None => term,
            Some(acc) if combine_and => and(&acc, &term),
            Some(acc) => or(&acc, &term),
        });
    }

    Ok(match (combined, general()) {
        (Some(c), Some(g)) => Some(and(&c, &g)),
        (c, _) => c,
    })
}

fn dependent_term(
    field: &str,
    allowed: &[AllowedValue],
    records: &RecordSet,
) -> Result<Mask, CoreError> {
    let column = records.require_column(field)?;
    if is_age_field(field) {
        let threshold = allowed
            .first()
            .ok_or_else(|| CoreError::malformed_rule(field, "age condition has no threshold"))?;
        let threshold = threshold.as_f64().ok_or_else(|| {
            CoreError::malformed_rule(field, format!("age threshold {threshold:?} is not numeric"))
        })?;
        Ok(column.map(|v| exceeds(v, threshold)).collect())
    } else {
        Ok(column.map(|v| is_allowed(allowed, v)).collect())
    }
}

/// Age fields use a strict lower-bound threshold instead of membership.
/// `Edad_Jefe` and `RANGO_EDAD` are age fields; `PROPIEDAD` is not.
pub fn is_age_field(name: &str) -> bool {
    name.contains(AGE_MARKER) || name.split('_').any(|token| token == AGE_TOKEN)
}

/// Strictly greater than `threshold`; null and non-numeric values never are.
fn exceeds(value: &Value, threshold: f64) -> bool {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.is_some_and(|n| n > threshold)
}

fn is_affirmative_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

fn and(a: &[bool], b: &[bool]) -> Mask {
    a.iter().zip(b).map(|(x, y)| *x && *y).collect()
}

fn or(a: &[bool], b: &[bool]) -> Mask {
    a.iter().zip(b).map(|(x, y)| *x || *y).collect()
}

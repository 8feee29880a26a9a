//! JSON persistence of a built rule grid.
//!
//! Grids are written in the [`RuleEntry`] layout. Loading also accepts the
//! older layout (`condicion`, `valores {valor, Tipo}`, `iand`, `opcional`,
//! `excluida_PTA`) so grids exported by earlier tooling keep working.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use super::rules::{AllowedValue, AllowedValues, Condition, RuleEntry, RuleGrid, ValueSpec, ValueType};
use crate::error::CoreError;

/// Keys that only the older layout uses.
const LEGACY_KEYS: [&str; 4] = ["condicion", "valores", "iand", "opcional"];

#[derive(Deserialize)]
struct LegacyEntry {
    /// Earlier tooling writes `null` for a dependent field with a blank condition.
    condicion: Option<IndexMap<String, Option<Vec<AllowedValue>>>>,
    valores: Option<LegacyValues>,
    iand: bool,
    opcional: bool,
    #[serde(rename = "excluida_PTA", default)]
    excluida_pta: bool,
}

#[derive(Deserialize)]
struct LegacyValues {
    valor: Option<AllowedValues>,
    #[serde(rename = "Tipo")]
    tipo: ValueType,
}

impl From<LegacyEntry> for RuleEntry {
    fn from(legacy: LegacyEntry) -> Self {
        Self {
            condition: legacy.condicion.map(|terms| {
                terms
                    .into_iter()
                    .map(|(dep, allowed)| (dep, allowed.unwrap_or_default()))
                    .collect::<Condition>()
            }),
            combine_and: legacy.iand,
            excluded_from_general: legacy.excluida_pta,
            value_spec: legacy.valores.and_then(|v| {
                v.valor.map(|allowed_values| ValueSpec {
                    allowed_values,
                    value_type: v.tipo,
                })
            }),
            mandatory: !legacy.opcional,
        }
    }
}

fn parse_entry(raw: Value) -> Result<RuleEntry, serde_json::Error> {
    let legacy = raw
        .as_object()
        .is_some_and(|o| LEGACY_KEYS.iter().any(|k| o.contains_key(*k)));
    if legacy {
        serde_json::from_value::<LegacyEntry>(raw).map(RuleEntry::from)
    } else {
        serde_json::from_value(raw)
    }
}

/// Parse a grid document. `origin` names the source in error messages.
pub fn parse_rule_grid(json: &str, origin: &str) -> Result<RuleGrid, CoreError> {
    let load_error = |reason: String| CoreError::GridLoad {
        path: origin.to_string(),
        reason,
    };

    let stored: IndexMap<String, Value> =
        serde_json::from_str(json).map_err(|e| load_error(e.to_string()))?;

    stored
        .into_iter()
        .map(|(field, raw)| match parse_entry(raw) {
            Ok(entry) => Ok((field, entry)),
            Err(e) => Err(load_error(format!("field '{field}': {e}"))),
        })
        .collect()
}

/// Read and parse a grid file.
pub fn load_rule_grid(path: &Path) -> Result<RuleGrid, CoreError> {
    let json = std::fs::read_to_string(path).map_err(|e| CoreError::GridLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let grid = parse_rule_grid(&json, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), fields = grid.len(), "Validation grid loaded");
    Ok(grid)
}

pub fn to_json_string(grid: &RuleGrid) -> Result<String, CoreError> {
    serde_json::to_string_pretty(grid).map_err(|e| CoreError::Internal(e.to_string()))
}

pub fn save_rule_grid(grid: &RuleGrid, path: &Path) -> Result<(), CoreError> {
    let json = to_json_string(grid)?;
    std::fs::write(path, json).map_err(|e| {
        CoreError::Internal(format!("cannot write grid to {}: {e}", path.display()))
    })
}

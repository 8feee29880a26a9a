//! Raw, header-addressed rule tables (the `Validaciones` and `Valores`
//! sheets), as consumed by the grid builder.

use std::io::Read;
use std::path::Path;

use crate::error::CoreError;

// ── Conditions table columns ─────────────────────────────────────────

pub const COL_FIELD: &str = "variable";
pub const COL_DEPENDENT: &str = "dependiente";
pub const COL_CONDITION: &str = "condicion";
pub const COL_CONDITION_TYPE: &str = "tipo_validacion";
pub const COL_COMBINE_AND: &str = "iand";
pub const COL_OPTIONAL: &str = "variable_opcional";
pub const COL_EXCLUDED: &str = "excluye_pta";

// ── Values table columns ─────────────────────────────────────────────

pub const COL_VALUES: &str = "valores";
pub const COL_VALUE_TYPE: &str = "tipo_valor";

/// A table of optional text cells with named columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RuleTable {
    /// Convenience constructor for in-memory tables; empty strings are blank.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
                .collect(),
        }
    }

    /// Read a CSV document with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| CoreError::MalformedRuleSource(format!("unreadable header row: {e}")))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                CoreError::MalformedRuleSource(format!("unreadable row {}: {e}", idx + 1))
            })?;
            rows.push(record.iter().map(|c| Some(c.to_string())).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, CoreError> {
        let file = std::fs::File::open(path).map_err(|e| {
            CoreError::MalformedRuleSource(format!("cannot open {}: {e}", path.display()))
        })?;
        Self::from_csv_reader(file)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of `name` in the header row.
    pub fn column_index(&self, name: &str) -> Result<usize, CoreError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CoreError::MalformedRuleSource(format!("missing column '{name}'")))
    }

    /// Trimmed cell text; blank and missing cells read as `None`.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

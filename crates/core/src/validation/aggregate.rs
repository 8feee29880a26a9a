//! Runs the grid over a record set, totals mandatory errors per record and
//! splits entity groups into valid and invalid partitions.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::grid::rules::RuleGrid;
use crate::records::RecordSet;
use crate::types::Flags;

use super::coerce::{coerce_integers, numeric_fields};
use super::field::evaluate_field;

// ── Identifying fields ───────────────────────────────────────────────

pub const HOUSEHOLD_ID_FIELD: &str = "id";
pub const REPRESENTATIVE_DOC_FIELD: &str = "NUMERODOCUMENTOTITULAR";
pub const MEMBER_DOC_FIELD: &str = "num_documento";

/// Name of the duplicate-document flag; always counted as mandatory.
pub const DUPLICATE_DOC_FLAG: &str = "Documento_Duplicado";

const ERROR_SEPARATOR: &str = ", ";

// ── Types ────────────────────────────────────────────────────────────

/// Grouping unit for the final validity decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityKey {
    #[serde(rename = "ID_HOGAR")]
    pub household_id: Value,
    #[serde(rename = "NUM_TITULAR")]
    pub representative_doc: Value,
    #[serde(rename = "NUM_DOC_INTEGRANTE")]
    pub member_doc: Value,
}

impl EntityKey {
    fn from_row(records: &RecordSet, row: usize) -> Self {
        Self {
            household_id: records.value(row, HOUSEHOLD_ID_FIELD).clone(),
            representative_doc: records.value(row, REPRESENTATIVE_DOC_FIELD).clone(),
            member_doc: records.value(row, MEMBER_DOC_FIELD).clone(),
        }
    }

    /// Canonical text used to group equal keys; nulls compare equal.
    fn group_key(&self) -> String {
        serde_json::json!([self.household_id, self.representative_doc, self.member_doc])
            .to_string()
    }
}

/// A field dropped from the run because it could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedField {
    pub field: String,
    pub reason: String,
}

/// Per-record result of running the grid.
#[derive(Debug, Clone, Default)]
pub struct ValidationTable {
    pub keys: Vec<EntityKey>,
    /// Error flags per evaluated field, plus [`DUPLICATE_DOC_FLAG`].
    pub flags: IndexMap<String, Flags>,
    /// Fields whose flags are summed into `totals`, in grid order.
    pub mandatory_fields: Vec<String>,
    /// `Validacion`: number of mandatory fields flagged per record.
    pub totals: Vec<u32>,
    /// `Errores`: flagged mandatory fields per record, `None` when clean.
    pub errors: Vec<Option<String>>,
    pub skipped_fields: Vec<SkippedField>,
}

impl ValidationTable {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn flag(&self, field: &str, row: usize) -> Option<u8> {
        self.flags.get(field).and_then(|f| f.get(row)).copied()
    }

    pub fn row(&self, row: usize) -> PartitionRow {
        PartitionRow {
            key: self.keys[row].clone(),
            total_errors: self.totals[row],
            errors: self.errors[row].clone(),
        }
    }
}

/// Output projection of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionRow {
    #[serde(flatten)]
    pub key: EntityKey,
    #[serde(rename = "Validacion")]
    pub total_errors: u32,
    #[serde(rename = "Errores")]
    pub errors: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partitions {
    pub valid: Vec<PartitionRow>,
    pub invalid: Vec<PartitionRow>,
}

/// Participant and household counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub participants: usize,
    pub households: usize,
    pub valid_participants: usize,
    pub valid_households: usize,
    pub invalid_participants: usize,
    pub invalid_households: usize,
    pub skipped_fields: usize,
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub table: ValidationTable,
    pub partitions: Partitions,
    pub summary: ValidationSummary,
}

// ── Steps ────────────────────────────────────────────────────────────

/// Flag every record whose `field` value already appeared earlier in the set.
pub fn flag_duplicates(records: &RecordSet, field: &str) -> Result<Flags, CoreError> {
    let mut seen = HashSet::new();
    Ok(records
        .require_column(field)?
        .map(|v| u8::from(!seen.insert(v.to_string())))
        .collect())
}

/// Evaluate every grid field present in `records` and total the mandatory
/// flags per record.
///
/// Fields that fail to evaluate are logged and skipped. Missing identifying
/// fields abort the run.
pub fn validate_records(records: &RecordSet, grid: &RuleGrid) -> Result<ValidationTable, CoreError> {
    if records.is_empty() {
        return Ok(ValidationTable {
            mandatory_fields: vec![DUPLICATE_DOC_FLAG.to_string()],
            ..Default::default()
        });
    }
    for id in [HOUSEHOLD_ID_FIELD, REPRESENTATIVE_DOC_FIELD, MEMBER_DOC_FIELD] {
        if !records.has_column(id) {
            return Err(CoreError::missing_field(id));
        }
    }

    let fields: Vec<String> = records
        .columns()
        .iter()
        .filter(|c| grid.contains(c))
        .cloned()
        .collect();
    let numeric = numeric_fields(records, grid, &fields);
    let data = coerce_integers(records, &numeric);

    let mut flags: IndexMap<String, Flags> = IndexMap::new();
    let mut skipped_fields = Vec::new();
    for (field, entry) in fields.iter().filter_map(|f| grid.get(f).map(|e| (f, e))) {
        match evaluate_field(field, entry, &data) {
            Ok(field_flags) => {
                flags.insert(field.clone(), field_flags);
            }
            Err(e) => {
                tracing::warn!(field = %field, error = %e, "Skipping field that could not be validated");
                skipped_fields.push(SkippedField {
                    field: field.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut mandatory_fields: Vec<String> = grid
        .mandatory_fields()
        .filter(|f| flags.contains_key(*f))
        .map(str::to_string)
        .collect();
    flags.insert(
        DUPLICATE_DOC_FLAG.to_string(),
        flag_duplicates(&data, MEMBER_DOC_FIELD)?,
    );
    mandatory_fields.push(DUPLICATE_DOC_FLAG.to_string());

    let keys: Vec<EntityKey> = (0..data.len()).map(|i| EntityKey::from_row(&data, i)).collect();
    let mut totals = Vec::with_capacity(keys.len());
    let mut errors = Vec::with_capacity(keys.len());
    for row in 0..keys.len() {
        let failed: Vec<&str> = mandatory_fields
            .iter()
            .filter(|f| flags[f.as_str()][row] == 1)
            .map(String::as_str)
            .collect();
        totals.push(failed.len() as u32);
        errors.push((!failed.is_empty()).then(|| failed.join(ERROR_SEPARATOR)));
    }

    Ok(ValidationTable {
        keys,
        flags,
        mandatory_fields,
        totals,
        errors,
        skipped_fields,
    })
}

/// Group records by entity key; groups with no mandatory errors are valid.
/// Groups keep first-appearance order and members keep record order.
pub fn partition(table: &ValidationTable) -> Partitions {
    let mut groups: IndexMap<String, (u32, Vec<usize>)> = IndexMap::new();
    for (row, key) in table.keys.iter().enumerate() {
        let group = groups.entry(key.group_key()).or_default();
        group.0 += table.totals[row];
        group.1.push(row);
    }

    let mut partitions = Partitions::default();
    for (total, rows) in groups.values() {
        let target = if *total == 0 {
            &mut partitions.valid
        } else {
            &mut partitions.invalid
        };
        target.extend(rows.iter().map(|&row| table.row(row)));
    }
    partitions
}

pub fn summarize(table: &ValidationTable, partitions: &Partitions) -> ValidationSummary {
    /// Distinct non-null household ids.
    fn households<'a>(keys: impl Iterator<Item = &'a EntityKey>) -> usize {
        keys.filter(|k| !k.household_id.is_null())
            .map(|k| k.household_id.to_string())
            .collect::<HashSet<_>>()
            .len()
    }

    ValidationSummary {
        participants: table.len(),
        households: households(table.keys.iter()),
        valid_participants: partitions.valid.len(),
        valid_households: households(partitions.valid.iter().map(|r| &r.key)),
        invalid_participants: partitions.invalid.len(),
        invalid_households: households(partitions.invalid.iter().map(|r| &r.key)),
        skipped_fields: table.skipped_fields.len(),
    }
}

/// Validate, partition and summarize in one pass.
pub fn run_validation(records: &RecordSet, grid: &RuleGrid) -> Result<ValidationOutcome, CoreError> {
    tracing::info!(
        records = records.len(),
        grid_fields = grid.len(),
        "Running validation grid"
    );

    let table = validate_records(records, grid)?;
    let partitions = partition(&table);
    let summary = summarize(&table, &partitions);

    tracing::info!(
        participants = summary.participants,
        households = summary.households,
        valid_participants = summary.valid_participants,
        valid_households = summary.valid_households,
        invalid_participants = summary.invalid_participants,
        invalid_households = summary.invalid_households,
        skipped_fields = summary.skipped_fields,
        "Validation grid results"
    );

    Ok(ValidationOutcome {
        table,
        partitions,
        summary,
    })
}

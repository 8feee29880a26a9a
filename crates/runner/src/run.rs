//! One batch run: load the grid and records, validate, write the partitions.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use valgrid_core::grid::builder::build_rule_grid;
use valgrid_core::grid::store::{load_rule_grid, save_rule_grid};
use valgrid_core::grid::tables::RuleTable;
use valgrid_core::{run_validation, RecordSet, RuleGrid, ValidationSummary};

use crate::config::{GridSource, RunnerConfig};

pub const VALID_FILE: &str = "validos.json";
pub const INVALID_FILE: &str = "no_validos.json";
pub const SUMMARY_FILE: &str = "resumen.json";

/// Load the rule grid from its configured source.
pub fn load_grid(source: &GridSource) -> anyhow::Result<RuleGrid> {
    match source {
        GridSource::Json(path) => Ok(load_rule_grid(path)?),
        GridSource::Tables { conditions, values } => {
            let conditions = RuleTable::from_csv_path(conditions)?;
            let values = RuleTable::from_csv_path(values)?;
            let grid = build_rule_grid(&conditions, &values)?;
            tracing::info!(fields = grid.len(), "Validation grid built from rule tables");
            Ok(grid)
        }
    }
}

pub fn load_records(path: &Path) -> anyhow::Result<RecordSet> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse records file: {}", path.display()))?;
    Ok(RecordSet::from_json(value)?)
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Execute a full run and return its summary.
pub fn run(config: &RunnerConfig) -> anyhow::Result<ValidationSummary> {
    let grid = load_grid(&config.grid)?;
    if let Some(out) = &config.grid_out {
        save_rule_grid(&grid, out)?;
        tracing::info!(path = %out.display(), "Validation grid written");
    }

    let records = load_records(&config.records_path)?;
    let outcome = run_validation(&records, &grid)?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;
    let valid = write_json(&config.output_dir, VALID_FILE, &outcome.partitions.valid)?;
    let invalid = write_json(&config.output_dir, INVALID_FILE, &outcome.partitions.invalid)?;
    write_json(&config.output_dir, SUMMARY_FILE, &outcome.summary)?;

    tracing::info!(
        valid = %valid.display(),
        invalid = %invalid.display(),
        "Partitions written"
    );

    Ok(outcome.summary)
}

//! `valgrid-runner` -- batch validation of survey records.
//!
//! Loads a rule grid (persisted JSON, or the CSV exports of the conditions
//! and values tables), validates a JSON array of flattened records against
//! it, and writes the valid and invalid partitions plus a run summary.
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default | Description                               |
//! |--------------------------|----------|---------|-------------------------------------------|
//! | `VALGRID_RECORDS_PATH`   | yes      | --      | JSON array of flattened records           |
//! | `VALGRID_GRID_PATH`      | *        | --      | Persisted grid JSON                       |
//! | `VALGRID_CONDITIONS_CSV` | *        | --      | Conditions table (with `VALUES_CSV`)      |
//! | `VALGRID_VALUES_CSV`     | *        | --      | Values table (with `CONDITIONS_CSV`)      |
//! | `VALGRID_GRID_OUT`       | no       | --      | Write the grid in use to this path        |
//! | `VALGRID_OUTPUT_DIR`     | no       | `.`     | Directory for the output files            |
//!
//! `*` one grid source is required.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valgrid_runner::config::RunnerConfig;
use valgrid_runner::run;

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "valgrid_runner=info,valgrid_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunnerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!("{e}");
        std::process::exit(2);
    });

    tracing::info!(
        records = %config.records_path.display(),
        output_dir = %config.output_dir.display(),
        "Starting valgrid-runner",
    );

    if let Err(e) = run::run(&config) {
        tracing::error!(error = %format!("{e:#}"), "Validation run failed");
        std::process::exit(1);
    }
}

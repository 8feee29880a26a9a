//! `valgrid-core`: rule-grid validation of flattened survey responses.
//!
//! The [`grid`] module holds the rule model, its builder from the raw rule
//! tables and JSON persistence. The [`validation`] module evaluates a grid
//! against a [`records::RecordSet`] and partitions the result.

pub mod error;
pub mod grid;
pub mod records;
pub mod types;
pub mod validation;

pub use error::CoreError;
pub use grid::rules::{RuleEntry, RuleGrid};
pub use records::RecordSet;
pub use validation::aggregate::{run_validation, ValidationOutcome, ValidationSummary};

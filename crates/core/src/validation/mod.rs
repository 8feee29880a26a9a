//! Grid evaluation engine.
//!
//! Applicability conditions, value constraints, per-field error flags and the
//! aggregation that partitions records into valid and invalid sets. Pure
//! logic over an in-memory [`RecordSet`](crate::records::RecordSet).

pub mod aggregate;
pub mod coerce;
pub mod condition;
pub mod field;
pub mod values;

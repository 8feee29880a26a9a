//! Rule grid: model, builder from raw rule tables, and JSON persistence.

pub mod builder;
pub mod rules;
pub mod store;
pub mod tables;

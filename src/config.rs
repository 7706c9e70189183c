//! Test configuration structs and JSON persistence.

pub mod persistence;
pub mod types;

//! Column projection for stored messages
//!
//! This module decides which physical columns to read for a given set of
//! required fields, so that only the data the caller needs is loaded.

pub mod plan;
pub mod required;

pub use plan::ProjectionPlan;
pub use required::RequiredFields;

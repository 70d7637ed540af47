//! Recommendation synthesis
//!
//! Template-driven rendering of DDL, rationale and impact text, with confidence
//! adjusted to table size and query frequency for index suggestions.

mod generator;

pub use generator::*;

//! optidb core - data model and collaborator contracts
//!
//! This crate provides the types every other optidb crate shares:
//!
//! - `QueryStats`, `TableInfo`, `IndexInfo` - captured statistics and schema metadata
//! - `Recommendation` - a typed, confidence-scored, risk-rated suggestion
//! - `StatsCollector` - contract for whatever pulls statistics out of the database
//! - `RecommendationAugmenter` - contract for an optional remote recommendation service

mod augmenter;
mod collector;
mod error;
mod recommendation;
mod types;

pub use augmenter::*;
pub use collector::*;
pub use error::*;
pub use recommendation::*;
pub use types::*;

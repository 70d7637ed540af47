//! Rule-based bottleneck detection
//!
//! Five stateless detectors each look at one anti-pattern of a query and its
//! schema, and the [`RuleEngine`] runs them in a fixed priority order behind a
//! call-count gate. An optional augmenter can replace the heuristic path for
//! a single call.

mod config;
mod detectors;
mod engine;
mod finding;

pub use config::*;
pub use detectors::*;
pub use engine::*;
pub use finding::*;

//! optidb analyzer - the recommendation pipeline
//!
//! This crate turns captured query statistics and schema metadata into ranked
//! recommendations:
//! - Fingerprinting: canonical query text and a stable content hash
//! - Reference extraction: tables, filter and join columns via lexical patterns
//! - Detectors: five independent rules producing typed findings
//! - Synthesis: template-driven recommendation text and confidence scoring
//! - Rule engine: gating, detector orchestration and optional augmenter use
//!
//! SQL is never parsed into a syntax tree. Every pattern here is a lexical
//! heuristic that misses aliased, quoted and schema-qualified identifiers,
//! multi-table WHERE clauses and CTEs.

pub mod extract;
pub mod fingerprint;
pub mod recommend;
pub mod rules;

pub use extract::*;
pub use fingerprint::*;
pub use recommend::*;
pub use rules::*;

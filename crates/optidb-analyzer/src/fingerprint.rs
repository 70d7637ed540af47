//! Query fingerprinting
//!
//! Normalization rewrites SQL text into a canonical form where literal values,
//! positional parameters, whitespace, letter case and the length of `IN (...)`
//! and `VALUES (...)` lists no longer matter. The fingerprint is the MD5 digest
//! of that canonical text.
//!
//! # Example
//!
//! ```
//! use optidb_analyzer::fingerprint::{fingerprint, normalize};
//!
//! assert_eq!(
//!     normalize("select * from t where id in (1, 2, 3)"),
//!     "SELECT * FROM T WHERE ID IN (?)"
//! );
//! assert_eq!(
//!     fingerprint("SELECT * FROM t WHERE id = 5"),
//!     fingerprint("select * from t where id = 999")
//! );
//! ```

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Token that stands in for any literal or parameter
pub const WILDCARD: &str = "?";

/// Number of hex characters in a [`QueryFingerprint::short_id`]
pub const SHORT_ID_LEN: usize = 12;

struct NormalizationRule {
    pattern: Regex,
    replacement: &'static str,
}

impl NormalizationRule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("normalization patterns are valid"),
            replacement,
        }
    }
}

// Applied in order after trimming and upper-casing.
static NORMALIZATION_RULES: LazyLock<Vec<NormalizationRule>> = LazyLock::new(|| {
    vec![
        NormalizationRule::new(r"\$\d+", WILDCARD),
        NormalizationRule::new(r"'[^']*'", WILDCARD),
        NormalizationRule::new(r"\b\d+\b", WILDCARD),
        NormalizationRule::new(r"\s+", " "),
        NormalizationRule::new(r"\(\s*\?\s*(,\s*\?\s*)*\)", "(?)"),
        NormalizationRule::new(r"\bIN\s*\(\s*\?\s*(,\s*\?\s*)*\)", "IN (?)"),
        NormalizationRule::new(r"\bVALUES\s*\(\s*\?\s*(,\s*\?\s*)*\)", "VALUES (?)"),
    ]
});

/// Rewrites SQL text into its canonical form
pub fn normalize(sql: &str) -> String {
    let mut normalized = sql.trim().to_uppercase();

    for rule in NORMALIZATION_RULES.iter() {
        normalized = rule
            .pattern
            .replace_all(&normalized, rule.replacement)
            .into_owned();
    }

    normalized.trim().to_string()
}

/// Computes the fingerprint of raw SQL text
pub fn fingerprint(sql: &str) -> QueryFingerprint {
    QueryFingerprint::of(sql)
}

/// 128-bit content identity of a normalized query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryFingerprint([u8; 16]);

impl QueryFingerprint {
    /// Normalizes `sql` and hashes the result
    pub fn of(sql: &str) -> Self {
        Self::of_normalized(&normalize(sql))
    }

    /// Hashes text that is already normalized
    pub fn of_normalized(normalized: &str) -> Self {
        Self(md5::compute(normalized.as_bytes()).0)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Full identity as 32 lowercase hex characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters, for display.
    ///
    /// Truncated IDs can collide; use the full fingerprint for identity.
    pub fn short_id(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_ID_LEN);
        hex
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for QueryFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

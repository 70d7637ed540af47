//! Recommendations - the output of the analysis pipeline
//!
//! A recommendation is a typed suggestion with proposed DDL (never executed),
//! an optional query rewrite, a rationale, an impact estimate, a confidence score
//! and a risk level. Confidence and risk are always kept inside their valid
//! ranges: out-of-range confidence becomes `0.5` and unknown risk text becomes
//! `medium`, whichever producer the value came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Confidence assigned when a producer hands over a value outside `0.0..=1.0`
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Kind of recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    /// Single-column index for a filtered column
    MissingIndex,
    /// Multi-column index for combined filters
    CompositeIndex,
    /// Subquery re-evaluated per outer row
    CorrelatedSubquery,
    /// Index on a JOIN column
    JoinIndex,
    /// Index made redundant by a wider one
    RedundantIndex,
    /// Stale or insufficient planner statistics
    CardinalityIssue,
}

impl RecommendationType {
    /// All variants in detector priority order
    pub const ALL: [RecommendationType; 6] = [
        Self::MissingIndex,
        Self::CompositeIndex,
        Self::CorrelatedSubquery,
        Self::JoinIndex,
        Self::RedundantIndex,
        Self::CardinalityIssue,
    ];

    /// Returns the wire name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingIndex => "missing_index",
            Self::CompositeIndex => "composite_index",
            Self::CorrelatedSubquery => "correlated_subquery",
            Self::JoinIndex => "join_index",
            Self::RedundantIndex => "redundant_index",
            Self::CardinalityIssue => "cardinality_issue",
        }
    }

    /// Returns a human-readable title for reports
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingIndex => "Missing Index",
            Self::CompositeIndex => "Composite Index Opportunity",
            Self::CorrelatedSubquery => "Correlated Subquery Optimization",
            Self::JoinIndex => "JOIN Index Missing",
            Self::RedundantIndex => "Redundant Index",
            Self::CardinalityIssue => "Cardinality Issue",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown recommendation type name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown recommendation type: {0}")]
pub struct UnknownRecommendationType(pub String);

impl FromStr for RecommendationType {
    type Err = UnknownRecommendationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownRecommendationType(s.to_string()))
    }
}

/// Risk of applying a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    /// Parses a risk level, coercing anything but `low`, `medium` or `high` to `Medium`
    pub fn parse_lossy(value: &str) -> Self {
        match value {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        Self::parse_lossy(&value)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replaces non-finite or out-of-range confidence with [`FALLBACK_CONFIDENCE`]
pub fn sanitize_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        confidence
    } else {
        FALLBACK_CONFIDENCE
    }
}

/// A single optimization recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Type of recommendation
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    /// Proposed statement; never executed by optidb
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl: Option<String>,
    /// Suggested query rewrite, possibly only a SQL comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_sql: Option<String>,
    /// Human-readable explanation
    pub rationale: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    /// Risk of applying the recommendation
    pub risk_level: RiskLevel,
    /// Expected performance impact in plain English
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_estimate: Option<String>,
    /// When the recommendation was produced
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    /// Creates a recommendation with fallback confidence and medium risk
    pub fn new(kind: RecommendationType, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            ddl: None,
            rewrite_sql: None,
            rationale: rationale.into(),
            confidence: FALLBACK_CONFIDENCE,
            risk_level: RiskLevel::Medium,
            impact_estimate: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the proposed DDL
    pub fn with_ddl(mut self, ddl: impl Into<String>) -> Self {
        self.ddl = Some(ddl.into());
        self
    }

    /// Sets the suggested rewrite
    pub fn with_rewrite_sql(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite_sql = Some(rewrite.into());
        self
    }

    /// Sets the confidence, replacing out-of-range values with the fallback
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = sanitize_confidence(confidence);
        self
    }

    /// Sets the risk level
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = risk;
        self
    }

    /// Sets the impact estimate
    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact_estimate = Some(impact.into());
        self
    }

    /// Sets the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the recommendation with its confidence forced into range
    pub fn sanitized(mut self) -> Self {
        self.confidence = sanitize_confidence(self.confidence);
        self
    }
}

/// Renders a byte count with binary units (B, KB, MB, GB)
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests;

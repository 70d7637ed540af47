use optidb_core::{Recommendation, RecommendationType, RiskLevel, format_bytes};

/// Raw output of a single detector, before it is rendered as a recommendation
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// A filtered column has no leading index on a large table
    MissingIndex { table: String, column: String },
    /// A subquery refers back to the outer query
    CorrelatedSubquery,
    /// One side of a JOIN condition has no leading index
    JoinIndex { table: String, column: String },
    /// `index` is a strict prefix of `covering_index` and rarely scanned
    RedundantIndex {
        index: String,
        covering_index: String,
        table: String,
        index_scans: u64,
        size_bytes: u64,
    },
    /// A large table is read with very low selectivity but still slowly
    CardinalityIssue { table: String, selectivity: f64 },
}

impl Finding {
    pub fn kind(&self) -> RecommendationType {
        match self {
            Self::MissingIndex { .. } => RecommendationType::MissingIndex,
            Self::CorrelatedSubquery => RecommendationType::CorrelatedSubquery,
            Self::JoinIndex { .. } => RecommendationType::JoinIndex,
            Self::RedundantIndex { .. } => RecommendationType::RedundantIndex,
            Self::CardinalityIssue { .. } => RecommendationType::CardinalityIssue,
        }
    }

    /// Renders the finding with the fixed confidence and risk of its detector.
    ///
    /// [`crate::RecommendationGenerator`] produces the template-driven form with
    /// adjusted confidence instead.
    pub fn into_recommendation(self) -> Recommendation {
        match self {
            Self::MissingIndex { table, column } => Recommendation::new(
                RecommendationType::MissingIndex,
                format!(
                    "Query performs sequential scan on table '{table}' filtering by column '{column}'. An index would improve performance."
                ),
            )
            .with_ddl(format!(
                "CREATE INDEX idx_{table}_{column} ON {table} ({column});"
            ))
            .with_confidence(0.8)
            .with_risk(RiskLevel::Low)
            .with_impact(format!(
                "Expected 50-90% performance improvement for queries filtering by {column}"
            )),
            Self::CorrelatedSubquery => Recommendation::new(
                RecommendationType::CorrelatedSubquery,
                "Query contains a correlated subquery that executes once per outer row. Consider rewriting as a JOIN or EXISTS for better performance.",
            )
            .with_rewrite_sql("-- Consider rewriting correlated subquery as JOIN or EXISTS clause")
            .with_confidence(0.7)
            .with_risk(RiskLevel::Medium)
            .with_impact("Expected 30-70% performance improvement by eliminating correlated subquery"),
            Self::JoinIndex { table, column } => Recommendation::new(
                RecommendationType::JoinIndex,
                format!(
                    "JOIN operation lacks index on column '{column}' in table '{table}', causing slow nested loop joins."
                ),
            )
            .with_ddl(format!(
                "CREATE INDEX idx_{table}_{column} ON {table} ({column});"
            ))
            .with_confidence(0.75)
            .with_risk(RiskLevel::Low)
            .with_impact("Expected 40-80% improvement in join performance"),
            Self::RedundantIndex {
                index,
                covering_index,
                table,
                index_scans,
                size_bytes,
            } => Recommendation::new(
                RecommendationType::RedundantIndex,
                format!(
                    "Index '{index}' on table '{table}' is redundant with '{covering_index}' and has low usage ({index_scans} scans). The larger index covers the same queries."
                ),
            )
            .with_ddl(format!("DROP INDEX {index};"))
            .with_confidence(0.85)
            .with_risk(RiskLevel::Low)
            .with_impact(format!(
                "Reclaim {} storage and reduce maintenance overhead",
                format_bytes(size_bytes)
            )),
            Self::CardinalityIssue { table, selectivity } => Recommendation::new(
                RecommendationType::CardinalityIssue,
                format!(
                    "Query has very low selectivity ({:.4}%) on large table '{table}' but still slow. Consider updating table statistics or creating expression indexes.",
                    selectivity * 100.0
                ),
            )
            .with_ddl(format!(
                "ANALYZE {table}; -- or ALTER TABLE {table} ALTER COLUMN <selective_column> SET STATISTICS 1000;"
            ))
            .with_confidence(0.60)
            .with_risk(RiskLevel::Low)
            .with_impact("Expected 20-50% improvement with better statistics"),
        }
    }
}

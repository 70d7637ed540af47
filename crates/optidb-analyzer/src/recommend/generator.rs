use crate::rules::Finding;
use minijinja::{Environment, Value, context};
use optidb_core::{QueryStats, Recommendation, RecommendationType, RiskLevel, TableInfo, format_bytes};

/// Text templates and default scores for one recommendation type
#[derive(Debug)]
pub struct RecommendationTemplate {
    pub ddl: Option<&'static str>,
    pub rationale: &'static str,
    pub impact: &'static str,
    pub default_confidence: f64,
    pub default_risk: RiskLevel,
}

static MISSING_INDEX: RecommendationTemplate = RecommendationTemplate {
    ddl: Some("CREATE INDEX idx_{{ table }}_{{ column }} ON {{ table }} ({{ column }});"),
    rationale: "Table '{{ table }}' with {{ row_count }} rows performs sequential scans on column '{{ column }}'. Adding an index will significantly improve query performance.",
    impact: "Expected 50-90% performance improvement for queries filtering by {{ column }}",
    default_confidence: 0.85,
    default_risk: RiskLevel::Low,
};

static COMPOSITE_INDEX: RecommendationTemplate = RecommendationTemplate {
    ddl: Some("CREATE INDEX idx_{{ index_suffix }} ON {{ table }} ({{ columns }});"),
    rationale: "Multiple column filters on table '{{ table }}' would benefit from a composite index covering columns ({{ columns }}).",
    impact: "Expected 40-80% improvement for multi-column WHERE clauses",
    default_confidence: 0.75,
    default_risk: RiskLevel::Low,
};

static CORRELATED_SUBQUERY: RecommendationTemplate = RecommendationTemplate {
    ddl: None,
    rationale: "Correlated subquery executes once per outer row ({{ calls }} calls). Consider rewriting as JOIN or EXISTS for better performance.",
    impact: "Expected 30-70% performance improvement by eliminating N+1 query pattern",
    default_confidence: 0.70,
    default_risk: RiskLevel::Medium,
};

static JOIN_INDEX: RecommendationTemplate = RecommendationTemplate {
    ddl: Some("CREATE INDEX idx_{{ table }}_{{ column }} ON {{ table }} ({{ column }});"),
    rationale: "JOIN operation on table '{{ table }}' lacks index on column '{{ column }}', causing nested loop joins instead of more efficient hash/merge joins.",
    impact: "Expected 40-80% improvement in join performance",
    default_confidence: 0.80,
    default_risk: RiskLevel::Low,
};

static REDUNDANT_INDEX: RecommendationTemplate = RecommendationTemplate {
    ddl: Some("DROP INDEX {{ index }};"),
    rationale: "Index '{{ index }}' on table '{{ table }}' is redundant with existing index '{{ covering_index }}' and consumes {{ size }} of storage.",
    impact: "Reclaim {{ size }} storage and reduce maintenance overhead",
    default_confidence: 0.90,
    default_risk: RiskLevel::Low,
};

static CARDINALITY_ISSUE: RecommendationTemplate = RecommendationTemplate {
    ddl: Some(
        "ANALYZE {{ table }}; -- or ALTER TABLE {{ table }} ALTER COLUMN <selective_column> SET STATISTICS 1000;",
    ),
    rationale: "Query has very low selectivity ({{ selectivity_pct }}%) on large table '{{ table }}' but still slow. Consider updating table statistics or creating expression indexes.",
    impact: "Expected 20-50% improvement with better statistics",
    default_confidence: 0.60,
    default_risk: RiskLevel::Low,
};

impl RecommendationTemplate {
    /// The template for `kind`
    pub fn for_type(kind: RecommendationType) -> &'static RecommendationTemplate {
        match kind {
            RecommendationType::MissingIndex => &MISSING_INDEX,
            RecommendationType::CompositeIndex => &COMPOSITE_INDEX,
            RecommendationType::CorrelatedSubquery => &CORRELATED_SUBQUERY,
            RecommendationType::JoinIndex => &JOIN_INDEX,
            RecommendationType::RedundantIndex => &REDUNDANT_INDEX,
            RecommendationType::CardinalityIssue => &CARDINALITY_ISSUE,
        }
    }
}

/// Rewrite hint for a query containing a subquery
pub fn subquery_rewrite(sql: &str) -> &'static str {
    let upper = sql.to_uppercase();
    if upper.contains("EXISTS") {
        "-- Consider using JOIN instead of EXISTS subquery\n-- Example: SELECT ... FROM table1 t1 JOIN table2 t2 ON t1.id = t2.foreign_id"
    } else if upper.contains("SELECT") && sql.contains('(') {
        "-- Consider rewriting correlated subquery as JOIN\n-- Example: Replace (SELECT ... WHERE outer.id = inner.id) with proper JOIN"
    } else {
        "-- Consider rewriting subquery as JOIN or window function for better performance"
    }
}

/// Builds fully formed recommendations from templates
pub struct RecommendationGenerator {
    env: Environment<'static>,
}

impl Default for RecommendationGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationGenerator {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Template default, raised by 0.1 for busy queries on big tables and
    /// lowered by 0.2 for small tables or rare queries
    pub fn adjusted_confidence(kind: RecommendationType, row_count: u64, query_count: u64) -> f64 {
        let base = RecommendationTemplate::for_type(kind).default_confidence;
        let adjusted = if row_count > 10_000 && query_count > 10 {
            base + 0.1
        } else if row_count < 1_000 || query_count < 5 {
            base - 0.2
        } else {
            base
        };
        adjusted.clamp(0.0, 1.0)
    }

    pub fn generate_index_recommendation(
        &self,
        table: &str,
        column: &str,
        row_count: u64,
        query_count: u64,
    ) -> Recommendation {
        let kind = RecommendationType::MissingIndex;
        self.build(
            kind,
            context! { table, column, row_count },
        )
        .with_confidence(Self::adjusted_confidence(kind, row_count, query_count))
    }

    pub fn generate_composite_index_recommendation(
        &self,
        table: &str,
        columns: &[String],
    ) -> Recommendation {
        let index_suffix = format!("{}_{}", table, columns.join("_"));
        self.build(
            RecommendationType::CompositeIndex,
            context! { table, index_suffix, columns => columns.join(", ") },
        )
    }

    pub fn generate_correlated_subquery_recommendation(&self, query: &QueryStats) -> Recommendation {
        self.build(
            RecommendationType::CorrelatedSubquery,
            context! { calls => query.calls },
        )
        .with_rewrite_sql(subquery_rewrite(&query.query))
    }

    pub fn generate_join_index_recommendation(&self, table: &str, column: &str) -> Recommendation {
        self.build(RecommendationType::JoinIndex, context! { table, column })
    }

    pub fn generate_redundant_index_recommendation(
        &self,
        index: &str,
        covering_index: &str,
        table: &str,
        size_bytes: u64,
    ) -> Recommendation {
        self.build(
            RecommendationType::RedundantIndex,
            context! { index, covering_index, table, size => format_bytes(size_bytes) },
        )
    }

    pub fn generate_cardinality_recommendation(&self, table: &str, selectivity: f64) -> Recommendation {
        self.build(
            RecommendationType::CardinalityIssue,
            context! { table, selectivity_pct => format!("{:.4}", selectivity * 100.0) },
        )
    }

    /// Renders a detector finding through the templates.
    ///
    /// Missing-index confidence is adjusted using the row count of the named
    /// table (zero when unknown) and the query's call count.
    pub fn generate_from_finding(
        &self,
        finding: &Finding,
        query: &QueryStats,
        tables: &[TableInfo],
    ) -> Recommendation {
        match finding {
            Finding::MissingIndex { table, column } => {
                let row_count = tables
                    .iter()
                    .find(|info| info.table_name.eq_ignore_ascii_case(table))
                    .map_or(0, |info| info.row_count);
                self.generate_index_recommendation(table, column, row_count, query.calls)
            }
            Finding::CorrelatedSubquery => self.generate_correlated_subquery_recommendation(query),
            Finding::JoinIndex { table, column } => {
                self.generate_join_index_recommendation(table, column)
            }
            Finding::RedundantIndex {
                index,
                covering_index,
                table,
                size_bytes,
                ..
            } => self.generate_redundant_index_recommendation(
                index,
                covering_index,
                table,
                *size_bytes,
            ),
            Finding::CardinalityIssue { table, selectivity } => {
                self.generate_cardinality_recommendation(table, *selectivity)
            }
        }
    }

    fn build(&self, kind: RecommendationType, ctx: Value) -> Recommendation {
        let template = RecommendationTemplate::for_type(kind);
        let mut recommendation = Recommendation::new(kind, self.render(template.rationale, &ctx))
            .with_impact(self.render(template.impact, &ctx))
            .with_confidence(template.default_confidence)
            .with_risk(template.default_risk);
        if let Some(ddl) = template.ddl {
            recommendation = recommendation.with_ddl(self.render(ddl, &ctx));
        }
        recommendation
    }

    fn render(&self, source: &'static str, ctx: &Value) -> String {
        let rendered = self
            .env
            .template_from_str(source)
            .and_then(|template| template.render(ctx));
        match rendered {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "failed to render recommendation template");
                source.to_string()
            }
        }
    }
}

use optidb_core::{AugmentError, AugmentResult, IndexInfo, QueryStats, RecommendationType, TableInfo};
use serde::Serialize;

/// System message sent with every request
pub const SYSTEM_PROMPT: &str =
    "You are an expert PostgreSQL performance analyst. Respond only with valid JSON.";

fn pretty_json<T: Serialize + ?Sized>(value: &T) -> AugmentResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AugmentError::Other(format!("failed to encode prompt data: {e}")))
}

/// Builds the user message describing one query and the schema it runs against
pub fn build_prompt(
    query: &QueryStats,
    tables: &[TableInfo],
    indexes: &[IndexInfo],
) -> AugmentResult<String> {
    let tables_json = pretty_json(tables)?;
    let indexes_json = pretty_json(indexes)?;
    let types = RecommendationType::ALL
        .iter()
        .map(|kind| format!("- {}: {}", kind.as_str(), kind.title()))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        r#"You are an expert PostgreSQL performance analyst. Analyze the following slow query and database metadata to provide actionable optimization recommendations.

QUERY PERFORMANCE DATA:
- SQL: {sql}
- Calls: {calls}
- Mean Execution Time: {mean:.2} ms
- Total Time: {total:.2} ms
- Rows Returned: {rows}
- Shared Blocks Hit: {hit}
- Shared Blocks Read: {read}

DATABASE TABLES:
{tables_json}

DATABASE INDEXES:
{indexes_json}

ANALYSIS REQUIREMENTS:
1. Identify specific performance bottlenecks in this query
2. Suggest concrete optimizations with DDL statements
3. Provide confidence scores (0.0-1.0) based on data evidence
4. Estimate performance impact in plain English
5. Assess risk level (low/medium/high) for each recommendation

RECOMMENDATION TYPES (use only these):
{types}

RESPONSE FORMAT (JSON only, no markdown):
{{
  "recommendations": [
    {{
      "type": "missing_index",
      "ddl": "CREATE INDEX idx_table_column ON table_name (column_name);",
      "rationale": "Detailed explanation of why this helps performance",
      "confidence": 0.85,
      "impact_estimate": "Expected 50-80% performance improvement",
      "risk_level": "low",
      "rewrite_sql": "Alternative SQL if applicable"
    }}
  ],
  "analysis": "Overall performance analysis summary"
}}

Provide only valid JSON response. Focus on actionable, high-impact recommendations based on the actual query patterns and database structure."#,
        sql = query.query,
        calls = query.calls,
        mean = query.mean_exec_time,
        total = query.total_time,
        rows = query.rows,
        hit = query.shared_blks_hit,
        read = query.shared_blks_read,
    ))
}

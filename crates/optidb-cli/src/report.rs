//! Terminal and JSON rendering of analysis results

use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};
use optidb_analyzer::{QueryFingerprint, normalize, statement_kind};
use optidb_core::{QueryStats, Recommendation};
use serde::Serialize;
use std::fmt::Write as _;

/// SQL width in the scan table
pub const SCAN_SQL_WIDTH: usize = 50;
/// SQL width in bottleneck details
pub const DETAIL_SQL_WIDTH: usize = 200;

/// One analyzed query and what the engine made of it
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub fingerprint: QueryFingerprint,
    /// Leading keyword category, e.g. `SELECT`
    pub statement: &'static str,
    pub query: String,
    pub calls: u64,
    pub mean_exec_time: f64,
    pub total_time: f64,
    pub rows: u64,
    /// Absent when the query touched no shared buffers
    pub cache_hit_ratio: Option<f64>,
    pub recommendations: Vec<Recommendation>,
}

impl QueryReport {
    pub fn new(stats: &QueryStats, recommendations: Vec<Recommendation>) -> Self {
        Self {
            fingerprint: QueryFingerprint::of(&stats.query),
            statement: statement_kind(&stats.query).as_str(),
            query: stats.query.clone(),
            calls: stats.calls,
            mean_exec_time: stats.mean_exec_time,
            total_time: stats.total_time,
            rows: stats.rows,
            cache_hit_ratio: (stats.shared_blks_hit > 0 || stats.shared_blks_read > 0)
                .then(|| stats.cache_hit_ratio()),
            recommendations,
        }
    }
}

/// Collapses whitespace and cuts to `max` characters, ending in `...` when cut
pub fn truncate_sql(sql: &str, max: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// `80%` style confidence
pub fn confidence_percent(confidence: f64) -> String {
    format!("{:.0}%", confidence * 100.0)
}

fn summary_lines(recommendation: &Recommendation) -> String {
    let mut text = format!(
        "• {} ({} confidence)",
        recommendation.kind,
        confidence_percent(recommendation.confidence)
    );
    if let Some(ddl) = &recommendation.ddl {
        let _ = write!(text, "\n  DDL: {ddl}");
    }
    let _ = write!(text, "\n  {}", recommendation.rationale);
    text
}

/// Query overview, with each query's recommendations listed beneath it
pub fn scan_table(reports: &[QueryReport]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "QUERY",
            "CALLS",
            "AVG TIME (ms)",
            "TOTAL TIME (ms)",
            "RECOMMENDATIONS",
        ]);

    for report in reports {
        table.add_row(vec![
            Cell::new(truncate_sql(&report.query, SCAN_SQL_WIDTH)),
            Cell::new(report.calls).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", report.mean_exec_time)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", report.total_time)).set_alignment(CellAlignment::Right),
            Cell::new(report.recommendations.len()).set_alignment(CellAlignment::Right),
        ]);

        if !report.recommendations.is_empty() {
            let details = report
                .recommendations
                .iter()
                .map(summary_lines)
                .collect::<Vec<_>>()
                .join("\n");
            table.add_row(vec![
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(details),
            ]);
        }
    }

    table
}

/// Detailed block for the `number`th bottleneck
pub fn render_bottleneck(number: usize, report: &QueryReport, show_ddl: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bottleneck #{number}");
    let _ = writeln!(out, "{}", "━".repeat(20));
    let _ = writeln!(out, "Query Stats:");
    let _ = writeln!(out, "   • Calls: {}", report.calls);
    let _ = writeln!(out, "   • Avg Time: {:.2} ms", report.mean_exec_time);
    let _ = writeln!(out, "   • Total Time: {:.2} ms", report.total_time);
    let _ = writeln!(out, "   • Rows: {}", report.rows);
    if let Some(ratio) = report.cache_hit_ratio {
        let _ = writeln!(out, "   • Cache Hit Ratio: {:.1}%", ratio * 100.0);
    }
    let _ = writeln!(out, "   • Statement: {}", report.statement);
    let _ = writeln!(out, "   • Fingerprint: {}...", report.fingerprint.short_id());
    let _ = writeln!(out, "   • SQL: {}", truncate_sql(&report.query, DETAIL_SQL_WIDTH));
    let _ = writeln!(out);
    let _ = writeln!(out, "Recommendations ({}):", report.recommendations.len());

    for (i, rec) in report.recommendations.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "   {}. {}", i + 1, rec.kind.title());
        let _ = writeln!(out, "      Confidence: {}", confidence_percent(rec.confidence));
        let _ = writeln!(out, "      Risk Level: {}", rec.risk_level);
        if let Some(ddl) = rec.ddl.as_ref().filter(|_| show_ddl) {
            let _ = writeln!(out, "      DDL:");
            let _ = writeln!(out, "         {ddl}");
        }
        if let Some(rewrite) = &rec.rewrite_sql {
            let _ = writeln!(out, "      Rewrite Suggestion:");
            let _ = writeln!(out, "         {rewrite}");
        }
        let _ = writeln!(out, "      Why: {}", rec.rationale);
        if let Some(impact) = &rec.impact_estimate {
            let _ = writeln!(out, "      Expected Impact: {impact}");
        }
    }

    out
}

/// Normalized text and identity of a statement
pub fn render_fingerprint(sql: &str) -> String {
    let normalized = normalize(sql);
    let fingerprint = QueryFingerprint::of_normalized(&normalized);
    format!(
        "Statement:   {}\nNormalized:  {normalized}\nFingerprint: {fingerprint}\nShort ID:    {}",
        statement_kind(sql).as_str(),
        fingerprint.short_id()
    )
}

//! Detectors
//!
//! Each detector is a pure function of the query, the table names it
//! references and the known schema, and yields at most one [`Finding`].
//! A detector never fails: malformed rows (an index without columns, an empty
//! table) are skipped.

use super::{Finding, RuleEngineConfig};
use crate::extract::{extract_filter_column, extract_join_conditions};
use optidb_core::{IndexInfo, QueryStats, TableInfo};
use regex::Regex;
use std::slice;
use std::sync::LazyLock;

/// Indexes scanned at least this often are never reported as redundant
pub const REDUNDANT_INDEX_MAX_SCANS: u64 = 10;

/// Row count a table must exceed before its statistics are questioned
pub const CARDINALITY_MIN_TABLE_ROWS: u64 = 100_000;

/// Selectivity below which a slow query hints at bad statistics
pub const CARDINALITY_MAX_SELECTIVITY: f64 = 0.001;

/// Mean execution time (ms) a low-selectivity query must exceed
pub const CARDINALITY_MIN_MEAN_MS: f64 = 1.0;

// A subquery that filters against a qualified column of the outer query,
// either nested in a SELECT or under EXISTS / NOT EXISTS.
static CORRELATED_SUBQUERY: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        r"(?is)SELECT.*\(.*SELECT.*WHERE.*=.*\w+\.",
        r"(?is)EXISTS.*\(.*SELECT.*WHERE.*=.*\.",
    ]
    .map(|pattern| Regex::new(pattern).expect("correlated subquery patterns are valid"))
});

/// Everything a detector may look at for one query
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub query: &'a QueryStats,
    /// Lowercase table names referenced by the query, in textual order
    pub table_names: &'a [String],
    pub tables: &'a [TableInfo],
    pub indexes: &'a [IndexInfo],
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        query: &'a QueryStats,
        table_names: &'a [String],
        tables: &'a [TableInfo],
        indexes: &'a [IndexInfo],
    ) -> Self {
        Self {
            query,
            table_names,
            tables,
            indexes,
        }
    }

    fn references(&self, table_name: &str) -> bool {
        self.table_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(table_name))
    }
}

/// The detectors, in the order the engine runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detector {
    MissingIndex,
    CorrelatedSubquery,
    InefficientJoin,
    RedundantIndex,
    CardinalityIssue,
}

impl Detector {
    /// All detectors in priority order
    pub const ALL: [Detector; 5] = [
        Self::MissingIndex,
        Self::CorrelatedSubquery,
        Self::InefficientJoin,
        Self::RedundantIndex,
        Self::CardinalityIssue,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingIndex => "missing_index",
            Self::CorrelatedSubquery => "correlated_subquery",
            Self::InefficientJoin => "inefficient_join",
            Self::RedundantIndex => "redundant_index",
            Self::CardinalityIssue => "cardinality_issue",
        }
    }

    /// Runs this detector against one query
    pub fn run(&self, config: &RuleEngineConfig, ctx: &AnalysisContext<'_>) -> Option<Finding> {
        match self {
            Self::MissingIndex => detect_missing_index(config, ctx),
            Self::CorrelatedSubquery => detect_correlated_subquery(config, ctx),
            Self::InefficientJoin => detect_inefficient_join(config, ctx),
            Self::RedundantIndex => detect_redundant_index(ctx),
            Self::CardinalityIssue => detect_cardinality_issue(ctx),
        }
    }
}

/// True if some index on one of `table_names` has `column` as its first column
fn has_leading_index(indexes: &[IndexInfo], column: &str, table_names: &[String]) -> bool {
    indexes.iter().any(|index| {
        table_names
            .iter()
            .any(|name| index.table_name.eq_ignore_ascii_case(name))
            && index
                .leading_column()
                .is_some_and(|leading| leading.eq_ignore_ascii_case(column))
    })
}

fn detect_missing_index(config: &RuleEngineConfig, ctx: &AnalysisContext<'_>) -> Option<Finding> {
    if ctx.query.mean_exec_time < config.min_seq_scan_time_ms {
        return None;
    }

    let column = extract_filter_column(&ctx.query.query)?;
    if has_leading_index(ctx.indexes, &column, ctx.table_names) {
        return None;
    }

    ctx.table_names
        .iter()
        .find(|name| {
            ctx.tables.iter().any(|table| {
                table.table_name.eq_ignore_ascii_case(name)
                    && table.row_count > config.min_table_size
            })
        })
        .map(|table| Finding::MissingIndex {
            table: table.clone(),
            column,
        })
}

fn detect_correlated_subquery(
    config: &RuleEngineConfig,
    ctx: &AnalysisContext<'_>,
) -> Option<Finding> {
    if ctx.query.mean_exec_time < config.min_seq_scan_time_ms * 2.0 {
        return None;
    }

    CORRELATED_SUBQUERY
        .iter()
        .any(|pattern| pattern.is_match(&ctx.query.query))
        .then_some(Finding::CorrelatedSubquery)
}

fn detect_inefficient_join(
    config: &RuleEngineConfig,
    ctx: &AnalysisContext<'_>,
) -> Option<Finding> {
    if ctx.query.mean_exec_time < config.min_seq_scan_time_ms {
        return None;
    }

    for join in extract_join_conditions(&ctx.query.query) {
        let right_indexed =
            has_leading_index(ctx.indexes, &join.right_column, slice::from_ref(&join.table));
        if !right_indexed {
            return Some(Finding::JoinIndex {
                table: join.table,
                column: join.right_column,
            });
        }

        let left_indexed = has_leading_index(ctx.indexes, &join.left_column, ctx.table_names);
        if !left_indexed {
            // The left side is attributed to the first referenced table.
            if let Some(table) = ctx.table_names.first() {
                return Some(Finding::JoinIndex {
                    table: table.clone(),
                    column: join.left_column,
                });
            }
        }
    }

    None
}

/// True if `short` is a case-insensitive prefix of `long` and strictly shorter
fn is_strict_prefix(short: &[String], long: &[String]) -> bool {
    short.len() < long.len()
        && short
            .iter()
            .zip(long)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

fn detect_redundant_index(ctx: &AnalysisContext<'_>) -> Option<Finding> {
    ctx.indexes
        .iter()
        .filter(|narrow| {
            ctx.references(&narrow.table_name)
                && !narrow.columns.is_empty()
                && narrow.index_scans < REDUNDANT_INDEX_MAX_SCANS
        })
        .find_map(|narrow| {
            ctx.indexes
                .iter()
                .find(|wide| {
                    wide.schema_name.eq_ignore_ascii_case(&narrow.schema_name)
                        && wide.table_name.eq_ignore_ascii_case(&narrow.table_name)
                        && is_strict_prefix(&narrow.columns, &wide.columns)
                })
                .map(|wide| Finding::RedundantIndex {
                    index: narrow.index_name.clone(),
                    covering_index: wide.index_name.clone(),
                    table: narrow.table_name.clone(),
                    index_scans: narrow.index_scans,
                    size_bytes: narrow.size_bytes,
                })
        })
}

fn detect_cardinality_issue(ctx: &AnalysisContext<'_>) -> Option<Finding> {
    if ctx.tables.is_empty() || ctx.query.rows == 0 {
        return None;
    }

    // First of the largest tables; empty tables never qualify.
    let mut largest: Option<&TableInfo> = None;
    for table in ctx.tables {
        if table.row_count > largest.map_or(0, |t| t.row_count) {
            largest = Some(table);
        }
    }
    let largest = largest?;

    let selectivity = ctx.query.rows as f64 / largest.row_count as f64;
    let qualifies = largest.row_count > CARDINALITY_MIN_TABLE_ROWS
        && selectivity < CARDINALITY_MAX_SELECTIVITY
        && ctx.query.mean_exec_time > CARDINALITY_MIN_MEAN_MS;

    qualifies.then(|| Finding::CardinalityIssue {
        table: largest.table_name.clone(),
        selectivity,
    })
}

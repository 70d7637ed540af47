//! Reference extraction
//!
//! Pulls table names, the leading filter column and equi-join conditions out of
//! raw SQL text with lexical patterns. This is deliberately not a parser:
//! aliases, subqueries, quoted and schema-qualified identifiers are not
//! resolved, and a `FROM` inside `EXTRACT(YEAR FROM col)` reads as a table.

use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

// Applied one keyword at a time, in this order.
static TABLE_REFERENCE: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    ["FROM", "JOIN", "INTO", "UPDATE"].map(|keyword| {
        Regex::new(&format!(r"(?i)\b{keyword}\s+([a-zA-Z_][a-zA-Z0-9_]*)"))
            .expect("table reference patterns are valid")
    })
});

// Matched against upper-cased text, in this order; the first pattern that
// matches anywhere decides the column.
static FILTER_COLUMN: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r"WHERE\s+(\w+)\s*=",
        r"WHERE\s+(\w+)\s*IN\b",
        r"WHERE\s+(\w+)\s*>",
        r"WHERE\s+(\w+)\s*<",
        r"WHERE\s+(\w+)\s*LIKE\b",
    ]
    .map(|pattern| Regex::new(pattern).expect("filter column patterns are valid"))
});

static JOIN_CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bJOIN\s+(\w+)\s+\w*\s*ON\s+\w+\.(\w+)\s*=\s*\w+\.(\w+)")
        .expect("join condition pattern is valid")
});

/// Statement category, judged by the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Other,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Drop => "DROP",
            Self::Other => "OTHER",
        }
    }
}

/// Classifies a statement by its first keyword
pub fn statement_kind(sql: &str) -> StatementKind {
    let upper = sql.trim_start().to_uppercase();
    [
        ("SELECT", StatementKind::Select),
        ("INSERT", StatementKind::Insert),
        ("UPDATE", StatementKind::Update),
        ("DELETE", StatementKind::Delete),
        ("CREATE", StatementKind::Create),
        ("ALTER", StatementKind::Alter),
        ("DROP", StatementKind::Drop),
    ]
    .into_iter()
    .find(|(keyword, _)| upper.starts_with(keyword))
    .map(|(_, kind)| kind)
    .unwrap_or(StatementKind::Other)
}

/// Lowercase table names following `FROM`, `JOIN`, `INTO` or `UPDATE`, without
/// duplicates: every `FROM` table in textual order, then every new `JOIN` table,
/// then `INTO`, then `UPDATE`
pub fn extract_tables(sql: &str) -> Vec<String> {
    TABLE_REFERENCE
        .iter()
        .flat_map(|pattern| pattern.captures_iter(sql))
        .map(|caps| caps[1].to_lowercase())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Lowercase column compared right after `WHERE` with `=`, `IN`, `>`, `<` or `LIKE`
pub fn extract_filter_column(sql: &str) -> Option<String> {
    let upper = sql.to_uppercase();
    FILTER_COLUMN
        .iter()
        .find_map(|pattern| pattern.captures(&upper))
        .map(|caps| caps[1].to_lowercase())
}

/// An equi-join condition of the form `JOIN table [alias] ON a.left = b.right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    /// The joined table
    pub table: String,
    /// Column on the left of `=`
    pub left_column: String,
    /// Column on the right of `=`
    pub right_column: String,
}

/// All `JOIN ... ON a.x = b.y` conditions, lowercased, in textual order
pub fn extract_join_conditions(sql: &str) -> Vec<JoinCondition> {
    let upper = sql.to_uppercase();
    JOIN_CONDITION
        .captures_iter(&upper)
        .map(|caps| JoinCondition {
            table: caps[1].to_lowercase(),
            left_column: caps[2].to_lowercase(),
            right_column: caps[3].to_lowercase(),
        })
        .collect()
}

//! Captured statistics and schema metadata
//!
//! These are snapshots handed over by a [`crate::StatsCollector`]. Nothing here
//! carries history or identity; a query's identity is derived from its text by
//! the fingerprinter.

use serde::{Deserialize, Serialize};

/// Performance snapshot of one distinct query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryStats {
    /// Raw SQL text as reported by the database
    pub query: String,
    /// Number of times the statement was executed
    pub calls: u64,
    /// Mean execution time in milliseconds
    pub mean_exec_time: f64,
    /// Total execution time in milliseconds
    pub total_time: f64,
    /// Total rows produced across all calls
    pub rows: u64,
    /// Shared buffer hits
    pub shared_blks_hit: u64,
    /// Shared buffer reads
    pub shared_blks_read: u64,
}

impl QueryStats {
    /// Creates stats for the given SQL text with all counters at zero
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Builder method: set call count
    pub fn with_calls(mut self, calls: u64) -> Self {
        self.calls = calls;
        self
    }

    /// Builder method: set mean execution time
    pub fn with_mean_exec_time(mut self, time_ms: f64) -> Self {
        self.mean_exec_time = time_ms;
        self
    }

    /// Builder method: set total execution time
    pub fn with_total_time(mut self, time_ms: f64) -> Self {
        self.total_time = time_ms;
        self
    }

    /// Builder method: set rows produced
    pub fn with_rows(mut self, rows: u64) -> Self {
        self.rows = rows;
        self
    }

    /// Builder method: set buffer hit/read counters
    pub fn with_buffers(mut self, hit: u64, read: u64) -> Self {
        self.shared_blks_hit = hit;
        self.shared_blks_read = read;
        self
    }

    /// Fraction of buffer accesses served from cache, 0.0 when nothing was touched
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.shared_blks_hit.saturating_add(self.shared_blks_read);
        if total == 0 {
            return 0.0;
        }
        self.shared_blks_hit as f64 / total as f64
    }
}

/// One physical table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableInfo {
    pub schema_name: String,
    pub table_name: String,
    /// Approximate row count
    pub row_count: u64,
    /// On-disk size in bytes
    pub size_bytes: u64,
}

impl TableInfo {
    /// Creates table info in the `public` schema
    pub fn new(table_name: impl Into<String>, row_count: u64) -> Self {
        Self {
            schema_name: "public".to_string(),
            table_name: table_name.into(),
            row_count,
            size_bytes: 0,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = schema.into();
        self
    }

    pub fn with_size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = size;
        self
    }
}

/// One index with its usage counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexInfo {
    pub schema_name: String,
    pub table_name: String,
    pub index_name: String,
    /// Indexed columns in index order
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
    pub size_bytes: u64,
    /// Number of index scans initiated
    pub index_scans: u64,
    /// Index entries returned by scans
    pub tuples_read: u64,
    /// Live table rows fetched by simple index scans
    pub tuples_fetch: u64,
}

impl IndexInfo {
    /// Creates index info in the `public` schema
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            schema_name: "public".to_string(),
            table_name: table_name.into(),
            index_name: index_name.into(),
            columns,
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema_name = schema.into();
        self
    }

    pub fn with_scans(mut self, scans: u64) -> Self {
        self.index_scans = scans;
        self
    }

    pub fn with_size_bytes(mut self, size: u64) -> Self {
        self.size_bytes = size;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_unique = true;
        self
    }

    /// First indexed column, if the column list is non-empty
    pub fn leading_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }
}

/// Everything one analysis pass needs, as pulled from a collector or loaded from disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub queries: Vec<QueryStats>,
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
}

impl Snapshot {
    pub fn new(queries: Vec<QueryStats>, tables: Vec<TableInfo>, indexes: Vec<IndexInfo>) -> Self {
        Self {
            queries,
            tables,
            indexes,
        }
    }

    /// Parses a snapshot from its JSON representation
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

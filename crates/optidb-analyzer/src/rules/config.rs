use serde::{Deserialize, Serialize};

/// Thresholds for the rule engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Tables at or below this row count never get an index suggestion
    pub min_table_size: u64,
    /// Mean execution time (ms) at which a query counts as slow
    pub min_seq_scan_time_ms: f64,
    /// Queries called fewer times than this are not analyzed
    pub min_calls: u64,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            min_table_size: 1000,
            min_seq_scan_time_ms: 0.1,
            min_calls: 5,
        }
    }
}

impl RuleEngineConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum table size
    pub fn with_min_table_size(mut self, rows: u64) -> Self {
        self.min_table_size = rows;
        self
    }

    /// Sets the slow-query threshold
    pub fn with_min_seq_scan_time_ms(mut self, time_ms: f64) -> Self {
        self.min_seq_scan_time_ms = time_ms;
        self
    }

    /// Sets the minimum call count
    pub fn with_min_calls(mut self, calls: u64) -> Self {
        self.min_calls = calls;
        self
    }
}

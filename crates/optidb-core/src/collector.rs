//! Stats collector contract
//!
//! A collector pulls query statistics and schema metadata out of a live
//! database. Query statistics are expected sorted by descending mean execution
//! time; callers apply any "top N" truncation themselves.

use crate::{IndexInfo, QueryStats, Result, Snapshot, TableInfo};
use async_trait::async_trait;

#[async_trait]
pub trait StatsCollector: Send + Sync {
    /// All captured statements, slowest first
    async fn query_stats(&self) -> Result<Vec<QueryStats>>;

    /// Captured statements whose mean execution time exceeds `min_mean_ms`, slowest first
    async fn slow_queries(&self, min_mean_ms: f64) -> Result<Vec<QueryStats>>;

    /// Table metadata
    async fn table_info(&self) -> Result<Vec<TableInfo>>;

    /// Index metadata and usage counters
    async fn index_info(&self) -> Result<Vec<IndexInfo>>;

    /// Pulls slow queries plus all table and index metadata in one go
    async fn snapshot(&self, min_mean_ms: f64) -> Result<Snapshot> {
        let queries = self.slow_queries(min_mean_ms).await?;
        let tables = self.table_info().await?;
        let indexes = self.index_info().await?;
        Ok(Snapshot::new(queries, tables, indexes))
    }
}

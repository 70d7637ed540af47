//! Statistics queries over the PostgreSQL catalog views

use super::PostgresConfig;
use async_trait::async_trait;
use optidb_core::{IndexInfo, OptidbError, QueryStats, Result, StatsCollector, TableInfo};
use tokio_postgres::{Client, NoTls, Row};

pub(crate) const QUERY_STATS_SQL: &str = "
    SELECT query, calls, mean_exec_time, total_exec_time, rows,
           shared_blks_hit, shared_blks_read
    FROM pg_stat_statements
    WHERE query NOT LIKE '%pg_stat_statements%'
      AND calls > 1
    ORDER BY mean_exec_time DESC
    LIMIT 100";

pub(crate) const SLOW_QUERIES_SQL: &str = "
    SELECT query, calls, mean_exec_time, total_exec_time, rows,
           shared_blks_hit, shared_blks_read
    FROM pg_stat_statements
    WHERE query NOT LIKE '%pg_stat_statements%'
      AND mean_exec_time > $1
      AND calls > 1
    ORDER BY mean_exec_time DESC
    LIMIT 50";

pub(crate) const TABLE_INFO_SQL: &str = "
    SELECT schemaname::text,
           relname::text AS tablename,
           (n_tup_ins + n_tup_upd + n_tup_del)::bigint AS row_count,
           pg_total_relation_size(relid)::bigint AS size_bytes
    FROM pg_stat_user_tables
    ORDER BY size_bytes DESC";

pub(crate) const INDEX_INFO_SQL: &str = "
    SELECT psi.schemaname::text,
           psi.relname::text AS tablename,
           psi.indexrelname::text AS indexname,
           COALESCE(
               array_to_string(
                   array(
                       SELECT pg_get_indexdef(psi.indexrelid, k + 1, true)
                       FROM generate_subscripts(pi.indkey, 1) AS k
                       ORDER BY k
                   ),
                   ','
               ),
               ''
           ) AS columns,
           pi.indisunique,
           pi.indisprimary,
           pg_relation_size(psi.indexrelid)::bigint AS size_bytes,
           COALESCE(psi.idx_scan, 0)::bigint,
           COALESCE(psi.idx_tup_read, 0)::bigint,
           COALESCE(psi.idx_tup_fetch, 0)::bigint
    FROM pg_stat_user_indexes psi
    JOIN pg_index pi ON psi.indexrelid = pi.indexrelid
    ORDER BY size_bytes DESC";

/// Formats a driver error with the server's detail and hint, when present
pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();
    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {detail})"));
    }
    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {hint})"));
    }

    match db_error.code().code() {
        "42P01" => format!("relation not found: {message}"),
        "42501" => format!("permission denied: {message}"),
        "28P01" | "28000" => format!("authentication failed: {message}"),
        _ => message,
    }
}

/// Splits the comma-joined column list rendered by `pg_get_indexdef`
pub fn split_index_columns(columns: &str) -> Vec<String> {
    if columns.trim().is_empty() {
        return Vec::new();
    }
    columns.split(',').map(|col| col.trim().to_string()).collect()
}

/// Clamps a signed catalog counter into the unsigned model field
pub(crate) fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn get<'a, T>(row: &'a Row, idx: usize, what: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(idx).map_err(|e| {
        OptidbError::Query(format!("failed to read {what}: {}", format_postgres_error(&e)))
    })
}

fn query_stats_from_row(row: &Row) -> Result<QueryStats> {
    Ok(QueryStats::new(get::<String>(row, 0, "query")?)
        .with_calls(non_negative(get(row, 1, "calls")?))
        .with_mean_exec_time(get(row, 2, "mean_exec_time")?)
        .with_total_time(get(row, 3, "total_exec_time")?)
        .with_rows(non_negative(get(row, 4, "rows")?))
        .with_buffers(
            non_negative(get(row, 5, "shared_blks_hit")?),
            non_negative(get(row, 6, "shared_blks_read")?),
        ))
}

fn table_info_from_row(row: &Row) -> Result<TableInfo> {
    Ok(
        TableInfo::new(get::<String>(row, 1, "table name")?, non_negative(get(row, 2, "row count")?))
            .with_schema(get::<String>(row, 0, "schema name")?)
            .with_size_bytes(non_negative(get(row, 3, "table size")?)),
    )
}

fn index_info_from_row(row: &Row) -> Result<IndexInfo> {
    let columns: String = get(row, 3, "index columns")?;
    let mut index = IndexInfo::new(
        get::<String>(row, 1, "table name")?,
        get::<String>(row, 2, "index name")?,
        split_index_columns(&columns),
    )
    .with_schema(get::<String>(row, 0, "schema name")?)
    .with_size_bytes(non_negative(get(row, 6, "index size")?))
    .with_scans(non_negative(get(row, 7, "idx_scan")?));

    if get::<bool>(row, 4, "indisunique")? {
        index = index.unique();
    }
    if get::<bool>(row, 5, "indisprimary")? {
        index = index.primary();
    }
    index.tuples_read = non_negative(get(row, 8, "idx_tup_read")?);
    index.tuples_fetch = non_negative(get(row, 9, "idx_tup_fetch")?);
    Ok(index)
}

/// Stats collector backed by a single `tokio-postgres` client
pub struct PostgresStatsCollector {
    client: Client,
}

impl PostgresStatsCollector {
    /// Connects and spawns the connection driver task on the current runtime
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        tracing::info!(
            target_db = %config.target(),
            user = %config.user,
            "connecting to PostgreSQL database"
        );

        let pg_config = config.to_pg_config()?;
        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to PostgreSQL");
            OptidbError::Connection(format!(
                "Failed to connect to PostgreSQL: {}",
                format_postgres_error(&e)
            ))
        })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        tracing::info!(target_db = %config.target(), "PostgreSQL connection established");
        Ok(Self::from_client(client))
    }

    /// Wraps an already connected client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch<T>(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        what: &str,
        map: fn(&Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        let rows = self.client.query(sql, params).await.map_err(|e| {
            tracing::error!(error = %e, "failed to query {what}");
            OptidbError::Query(format!("failed to query {what}: {}", format_postgres_error(&e)))
        })?;
        rows.iter().map(map).collect()
    }
}

#[async_trait]
impl StatsCollector for PostgresStatsCollector {
    async fn query_stats(&self) -> Result<Vec<QueryStats>> {
        tracing::info!("collecting query statistics from pg_stat_statements");
        let stats = self
            .fetch(QUERY_STATS_SQL, &[], "pg_stat_statements", query_stats_from_row)
            .await?;
        tracing::info!(records = stats.len(), "collected query statistics");
        Ok(stats)
    }

    async fn slow_queries(&self, min_mean_ms: f64) -> Result<Vec<QueryStats>> {
        tracing::info!(min_mean_ms, "collecting slow queries");
        let stats = self
            .fetch(SLOW_QUERIES_SQL, &[&min_mean_ms], "slow queries", query_stats_from_row)
            .await?;
        for query in &stats {
            tracing::debug!(
                calls = query.calls,
                mean_exec_time_ms = query.mean_exec_time,
                query = %query.query.chars().take(50).collect::<String>(),
                "found slow query"
            );
        }
        tracing::info!(records = stats.len(), "collected slow queries");
        Ok(stats)
    }

    async fn table_info(&self) -> Result<Vec<TableInfo>> {
        tracing::info!("collecting table information from pg_stat_user_tables");
        let tables = self
            .fetch(TABLE_INFO_SQL, &[], "table info", table_info_from_row)
            .await?;
        tracing::info!(records = tables.len(), "collected table information");
        Ok(tables)
    }

    async fn index_info(&self) -> Result<Vec<IndexInfo>> {
        tracing::info!("collecting index information from pg_stat_user_indexes");
        let indexes = self
            .fetch(INDEX_INFO_SQL, &[], "index info", index_info_from_row)
            .await?;
        for index in &indexes {
            tracing::debug!(
                index = %index.index_name,
                schema = %index.schema_name,
                table = %index.table_name,
                columns = %index.columns.join(", "),
                "found index"
            );
        }
        tracing::info!(records = indexes.len(), "collected index information");
        Ok(indexes)
    }
}

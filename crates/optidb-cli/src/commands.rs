//! Subcommand handlers

use crate::report::{self, QueryReport};
use crate::settings::Settings;
use anyhow::{Context, Result};
use clap::{ArgAction, Args, ValueEnum};
use optidb_ai::AzureOpenAiAugmenter;
use optidb_analyzer::RuleEngine;
use optidb_core::{IndexInfo, QueryStats, Snapshot, StatsCollector, TableInfo};
use optidb_monitor::PostgresStatsCollector;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Slow-query threshold used by `bottlenecks`
pub const BOTTLENECK_MIN_DURATION_MS: f64 = 0.1;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Minimum mean query duration in ms to analyze
    #[arg(long, default_value_t = 0.1)]
    pub min_duration: f64,

    /// Number of top queries to analyze
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct BottlenecksArgs {
    /// Number of bottlenecks to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Show DDL recommendations
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub ddl: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Snapshot file with `queries`, `tables` and `indexes`
    #[arg(long, short)]
    pub input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Query table with recommendations
    Table,
    /// Pretty-printed JSON array of query reports
    Json,
}

/// Rule engine with the Azure augmenter attached when it is enabled and configured
pub fn build_engine(settings: &Settings) -> RuleEngine {
    let engine = RuleEngine::new(settings.engine.clone());

    let Some(config) = settings.azure_config(|key| std::env::var(key).ok()) else {
        tracing::debug!(
            ai_enabled = settings.ai.enabled,
            "Azure OpenAI not in use, heuristics only"
        );
        return engine;
    };

    match AzureOpenAiAugmenter::new(config) {
        Ok(augmenter) => engine.with_augmenter(Arc::new(augmenter)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to initialize Azure OpenAI, heuristics only");
            engine
        }
    }
}

/// Analyzes queries in order; stops early once `cancel` fires
pub async fn analyze_all(
    engine: &RuleEngine,
    queries: &[QueryStats],
    tables: &[TableInfo],
    indexes: &[IndexInfo],
    cancel: &CancellationToken,
) -> Vec<QueryReport> {
    let mut reports = Vec::with_capacity(queries.len());
    for query in queries {
        let recommendations = engine
            .analyze_query_with_cancel(query, tables, indexes, cancel)
            .await;
        reports.push(QueryReport::new(query, recommendations));

        if cancel.is_cancelled() {
            tracing::warn!(analyzed = reports.len(), "analysis interrupted");
            break;
        }
    }
    reports
}

/// Reads an offline snapshot from disk
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    Snapshot::from_json(&content)
        .with_context(|| format!("Invalid snapshot: {}", path.display()))
}

fn total_recommendations(reports: &[QueryReport]) -> usize {
    reports.iter().map(|r| r.recommendations.len()).sum()
}

async fn connect(settings: &Settings) -> Result<PostgresStatsCollector> {
    PostgresStatsCollector::connect(&settings.database)
        .await
        .context("Failed to connect to database")
}

pub async fn run_scan(settings: &Settings, args: &ScanArgs, cancel: &CancellationToken) -> Result<()> {
    tracing::info!(
        min_duration_ms = args.min_duration,
        top = args.top,
        "starting database scan"
    );
    println!("Scanning database for performance issues...");

    let collector = connect(settings).await?;
    let engine = build_engine(settings);

    println!("Collecting query statistics...");
    let queries = collector
        .slow_queries(args.min_duration)
        .await
        .context("Failed to collect query stats")?;

    if queries.is_empty() {
        println!("No slow queries found (duration > {:.1}ms)", args.min_duration);
        return Ok(());
    }

    println!("Collecting table and index metadata...");
    let tables = collector
        .table_info()
        .await
        .context("Failed to collect table info")?;
    let indexes = collector
        .index_info()
        .await
        .context("Failed to collect index info")?;

    let top = &queries[..queries.len().min(args.top)];
    println!("Analyzing {} slow queries...", top.len());
    let reports = analyze_all(&engine, top, &tables, &indexes, cancel).await;
    let recommendation_count = total_recommendations(&reports);

    println!("{}", report::scan_table(&reports));
    println!();
    println!("Scan Summary:");
    println!("   • Analyzed {} slow queries", reports.len());
    println!("   • Found {} tables with {} indexes", tables.len(), indexes.len());
    println!("   • Generated {recommendation_count} recommendations");

    if recommendation_count > 0 {
        println!();
        println!("Run 'optidb bottlenecks' to see detailed recommendations");
    }
    Ok(())
}

pub async fn run_bottlenecks(
    settings: &Settings,
    args: &BottlenecksArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    tracing::info!(limit = args.limit, "starting bottlenecks analysis");
    println!("Top Database Performance Bottlenecks");
    println!("{}", "=".repeat(37));

    let collector = connect(settings).await?;
    let engine = build_engine(settings);

    let snapshot = collector
        .snapshot(BOTTLENECK_MIN_DURATION_MS)
        .await
        .context("Failed to collect statistics")?;

    if snapshot.queries.is_empty() {
        println!("No performance bottlenecks detected!");
        return Ok(());
    }

    let mut count = 0;
    for query in &snapshot.queries {
        if count >= args.limit || cancel.is_cancelled() {
            break;
        }

        let recommendations = engine
            .analyze_query_with_cancel(query, &snapshot.tables, &snapshot.indexes, cancel)
            .await;
        if recommendations.is_empty() {
            tracing::debug!(
                query = %report::truncate_sql(&query.query, report::SCAN_SQL_WIDTH),
                "no recommendations for query"
            );
            continue;
        }

        count += 1;
        tracing::info!(
            bottleneck = count,
            recommendations = recommendations.len(),
            "found bottleneck"
        );
        let query_report = QueryReport::new(query, recommendations);
        println!();
        print!("{}", report::render_bottleneck(count, &query_report, args.ddl));
        println!();
        print!("{}", "─".repeat(50));
    }

    if count == 0 {
        println!("No actionable bottlenecks found in top queries!");
    } else {
        tracing::info!(bottlenecks = count, "bottlenecks analysis complete");
        println!();
        println!();
        println!("Summary: Found {count} bottlenecks with optimization opportunities");
        println!("Use --ddl=false to hide DDL statements");
        println!("Use --limit=N to show more/fewer results");
    }
    Ok(())
}

pub async fn run_analyze(
    settings: &Settings,
    args: &AnalyzeArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let snapshot = read_snapshot(&args.input)?;
    tracing::info!(
        queries = snapshot.queries.len(),
        tables = snapshot.tables.len(),
        indexes = snapshot.indexes.len(),
        "analyzing snapshot"
    );

    let engine = build_engine(settings);
    let reports = analyze_all(
        &engine,
        &snapshot.queries,
        &snapshot.tables,
        &snapshot.indexes,
        cancel,
    )
    .await;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports)
                .context("Failed to serialize analysis")?;
            println!("{json}");
        }
        OutputFormat::Table => {
            println!("{}", report::scan_table(&reports));
            println!(
                "Analyzed {} queries, generated {} recommendations",
                reports.len(),
                total_recommendations(&reports)
            );
        }
    }
    Ok(())
}

pub fn run_fingerprint(sql: &str) -> Result<()> {
    println!("{}", report::render_fingerprint(sql));
    Ok(())
}

//! optidb - SQL performance profiler
//!
//! Reads `pg_stat_statements` and catalog statistics from PostgreSQL, or an
//! offline JSON snapshot, and prints index and rewrite recommendations.
//!
//! Usage:
//!   optidb scan --min-duration 1.0 --top 20
//!   optidb bottlenecks --limit 5
//!   optidb analyze --input snapshot.json --format json
//!   optidb fingerprint "SELECT * FROM orders WHERE id = 42"

mod commands;
mod logging;
mod report;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{AnalyzeArgs, BottlenecksArgs, ScanArgs};
use settings::Settings;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "optidb", version, about = "SQL performance profiler", long_about = None)]
struct Cli {
    /// Settings file (defaults to the optidb config directory)
    #[arg(long, global = true, env = "OPTIDB_CONFIG")]
    config: Option<PathBuf>,

    /// Never call the AI augmenter
    #[arg(long, global = true)]
    no_ai: bool,

    /// Also write JSON logs to daily rolling files
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the database for slow queries and performance issues
    Scan(ScanArgs),
    /// Show the top bottlenecks with detailed recommendations
    Bottlenecks(BottlenecksArgs),
    /// Analyze a JSON snapshot offline
    Analyze(AnalyzeArgs),
    /// Print the normalized form and fingerprint of a statement
    Fingerprint {
        /// SQL text
        sql: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.no_ai {
        settings.ai.enabled = false;
    }
    if cli.log_json {
        settings.logging.json = true;
    }

    let _log_guard = logging::init(&logging::LoggingConfig::from_settings(&settings))?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing current query");
                cancel.cancel();
            }
        }
    });

    match &cli.command {
        Commands::Scan(args) => commands::run_scan(&settings, args, &cancel).await,
        Commands::Bottlenecks(args) => commands::run_bottlenecks(&settings, args, &cancel).await,
        Commands::Analyze(args) => commands::run_analyze(&settings, args, &cancel).await,
        Commands::Fingerprint { sql } => commands::run_fingerprint(sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let cli = Cli::parse_from(["optidb", "scan"]);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.min_duration, 0.1);
                assert_eq!(args.top, 20);
            }
            other => panic!("expected scan, got {other:?}"),
        }
        assert!(!cli.no_ai);
    }

    #[test]
    fn test_bottlenecks_ddl_flag_takes_value() {
        let cli = Cli::parse_from(["optidb", "bottlenecks", "--ddl=false", "--limit", "3"]);
        match cli.command {
            Commands::Bottlenecks(args) => {
                assert!(!args.ddl);
                assert_eq!(args.limit, 3);
            }
            other => panic!("expected bottlenecks, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "optidb",
            "analyze",
            "--input",
            "snap.json",
            "--format",
            "json",
            "--no-ai",
            "--log-json",
        ]);
        assert!(cli.no_ai);
        assert!(cli.log_json);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.input, PathBuf::from("snap.json"));
                assert_eq!(args.format, commands::OutputFormat::Json);
            }
            other => panic!("expected analyze, got {other:?}"),
        }
    }
}

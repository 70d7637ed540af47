//! PostgreSQL statistics collector
//!
//! Requires the `pg_stat_statements` extension on the target server and a
//! role allowed to read the statistics views.

mod collector;
mod config;


pub use collector::*;
pub use config::*;

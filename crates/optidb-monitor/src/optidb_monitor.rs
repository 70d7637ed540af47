//! optidb monitor - statistics collection from a live PostgreSQL server
//!
//! Reads `pg_stat_statements`, `pg_stat_user_tables` and
//! `pg_stat_user_indexes` into the optidb data model.

pub mod postgres;

pub use postgres::*;

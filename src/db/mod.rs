//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `LedgerStorage` repository

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbAccount, DbClient, Novelty, Transaction};
pub use schema::SQLITE_INIT;
pub use sqlite::{FALLBACK_CLIENT_NAME, LedgerStorage, SqlitePool};

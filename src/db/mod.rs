pub mod migrate;
pub mod repository;
pub mod schema;
pub mod sqlite;

pub use migrate::{ensure_all_tables, ensure_schema, MigrationOutcome, TableState};
pub use sqlite::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("migration failed for table {table}: {reason}")]
    MigrationFailed { table: String, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

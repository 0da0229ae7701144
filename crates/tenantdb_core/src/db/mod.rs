//! SQLite-backed document storage.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the document store.
//! - Apply schema migrations in deterministic order.
//! - Expose collection-level find/count/insert/update/delete primitives.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No document is read or written before migrations succeed.
//! - Store errors never carry domain meaning; repositories classify them.

use thiserror::Error;

pub mod filter;
pub mod migrations;
mod open;
pub mod store;

pub use filter::{Filter, FilterValue};
pub use open::{open_db, open_db_in_memory, open_with_config};
pub use store::{now_epoch_ms, DocumentStore, RawDocument};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    #[error("document store requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("document store requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("document body encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid persisted document data: {0}")]
    InvalidData(String),
}

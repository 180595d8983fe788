//! `seele-store` — relational + vector + full-text storage for sessions,
//! messages, summaries, and scheduled tasks. Single-writer, transaction-backed.

pub mod conversations;
pub mod error;
pub mod schema;
pub mod sessions;
pub mod summaries;
pub mod tasks;
pub mod types;
pub mod vector;

use std::sync::Mutex;

use rusqlite::Connection;

pub use error::{Result, StoreError};
pub use types::*;

/// Owns the single SQLite connection backing all persistence. Cloned handles
/// share one writer via an internal mutex, matching the engine's
/// single-writer concurrency policy.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if absent) the database file at `path` and ensure the
    /// schema exists.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database, primarily for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

//! SQLite persistence for templates, connections, test records, and
//! provider descriptors.
//!
//! A single [`Store`] owns one connection behind a mutex. Every public
//! method takes `&self`, so a `Store` can be shared through an `Arc`.

mod connections;
mod history;
mod providers;
mod schema;
mod templates;

pub use connections::NewConnection;
pub use history::HISTORY_LIMIT;

use chrono::{DateTime, SecondsFormat, Utc};
use promptsmith_core::{AppError, AppResult};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle to the promptsmith database.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<rusqlite::Connection>,
}

impl Store {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = rusqlite::Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("Failed to open database: {}", e)))?;

        tracing::debug!("Opened database at {:?}", db_path);
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| AppError::Storage(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: rusqlite::Connection) -> AppResult<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map a rusqlite error to a storage error with context.
pub(crate) fn db_err(action: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Storage(format!("Failed to {}: {}", action, e))
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

pub(crate) fn parse_json<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".promptsmith/nested/promptsmith.db");

        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        drop(store);

        // Re-opening an existing database keeps the schema intact.
        assert!(Store::open(&path).is_ok());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = now();
        let parsed = parse_ts(0, &format_ts(&ts)).unwrap();
        assert_eq!(parsed.timestamp_micros(), ts.timestamp_micros());
    }
}

//! Connection records.
//!
//! At most one connection per (user, provider) carries the default flag.
//! Every write that sets the flag clears the others in the same
//! transaction.

use crate::{db_err, format_ts, now, parse_json, parse_opt_ts, parse_ts, to_json, Store};
use chrono::{DateTime, Utc};
use promptsmith_core::{AppError, AppResult};
use promptsmith_llm::{Connection, ConnectionStatus, ProviderConfig};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, Transaction};

const SELECT_CONNECTION: &str = "SELECT c.id, c.user_id, c.provider, p.name, c.name, c.config, \
     c.is_default, c.status, c.last_tested_at, c.last_error, c.created_at, c.updated_at \
     FROM connections c LEFT JOIN providers p ON p.id = c.provider";

/// Fields for a new connection.
#[derive(Debug, Clone, Default)]
pub struct NewConnection {
    pub user_id: i64,
    pub provider: String,
    pub name: Option<String>,
    pub config: ProviderConfig,
    pub is_default: bool,
}

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<Connection> {
    let config: String = row.get(5)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    let status = ConnectionStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("unknown connection status '{}'", status).into(),
        )
    })?;

    Ok(Connection {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider: row.get(2)?,
        provider_name: row.get(3)?,
        name: row.get(4)?,
        config: parse_json(5, &config)?,
        is_default: row.get(6)?,
        status,
        last_tested_at: parse_opt_ts(8, row.get(8)?)?,
        last_error: row.get(9)?,
        created_at: parse_ts(10, &created_at)?,
        updated_at: parse_ts(11, &updated_at)?,
    })
}

fn clear_other_defaults(tx: &Transaction<'_>, user_id: i64, provider: &str, keep: i64) -> AppResult<()> {
    tx.execute(
        "UPDATE connections SET is_default = 0
         WHERE user_id = ?1 AND provider = ?2 AND id != ?3 AND is_default = 1",
        params![user_id, provider, keep],
    )
    .map_err(db_err("clear default connections"))?;
    Ok(())
}

impl Store {
    /// Create a connection in `offline` state.
    pub fn insert_connection(&self, new: &NewConnection) -> AppResult<Connection> {
        let id = {
            let mut conn = self.conn();
            let tx = conn.transaction().map_err(db_err("begin transaction"))?;
            let ts = format_ts(&now());

            tx.execute(
                "INSERT INTO connections (user_id, provider, name, config, is_default, status,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'offline', ?6, ?6)",
                params![
                    new.user_id,
                    new.provider,
                    new.name,
                    to_json(&new.config)?,
                    new.is_default,
                    ts,
                ],
            )
            .map_err(db_err("insert connection"))?;
            let id = tx.last_insert_rowid();

            if new.is_default {
                clear_other_defaults(&tx, new.user_id, &new.provider, id)?;
            }

            tx.commit().map_err(db_err("commit connection"))?;
            id
        };

        self.require_connection(id)
    }

    /// Replace a connection's display name and configuration.
    pub fn update_connection(
        &self,
        id: i64,
        name: Option<&str>,
        config: &ProviderConfig,
    ) -> AppResult<Connection> {
        let changed = self
            .conn()
            .execute(
                "UPDATE connections SET name = ?2, config = ?3, updated_at = ?4 WHERE id = ?1",
                params![id, name, to_json(config)?, format_ts(&now())],
            )
            .map_err(db_err("update connection"))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("Connection {}", id)));
        }
        self.require_connection(id)
    }

    /// Make `id` the only default among its owner's connections to the same provider.
    pub fn set_default_connection(&self, id: i64) -> AppResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(db_err("begin transaction"))?;

        let (user_id, provider): (i64, String) = tx
            .query_row(
                "SELECT user_id, provider FROM connections WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(db_err("load connection"))?
            .ok_or_else(|| AppError::NotFound(format!("Connection {}", id)))?;

        clear_other_defaults(&tx, user_id, &provider, id)?;
        tx.execute(
            "UPDATE connections SET is_default = 1, updated_at = ?2 WHERE id = ?1",
            params![id, format_ts(&now())],
        )
        .map_err(db_err("set default connection"))?;

        tx.commit().map_err(db_err("commit default connection"))?;
        Ok(())
    }

    /// Record a status transition.
    ///
    /// `tested_at` and `last_error` are written only when `tested_at` is
    /// set, so moving into `testing` keeps the previous outcome visible.
    pub fn set_connection_status(
        &self,
        id: i64,
        status: ConnectionStatus,
        tested_at: Option<DateTime<Utc>>,
        last_error: Option<&str>,
    ) -> AppResult<()> {
        let conn = self.conn();
        let ts = format_ts(&now());

        let changed = match tested_at {
            Some(tested_at) => conn.execute(
                "UPDATE connections SET status = ?2, last_tested_at = ?3, last_error = ?4,
                    updated_at = ?5
                 WHERE id = ?1",
                params![id, status.as_str(), format_ts(&tested_at), last_error, ts],
            ),
            None => conn.execute(
                "UPDATE connections SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), ts],
            ),
        }
        .map_err(db_err("update connection status"))?;

        if changed == 0 {
            return Err(AppError::NotFound(format!("Connection {}", id)));
        }
        Ok(())
    }

    /// Delete a connection and its test history.
    pub fn delete_connection(&self, id: i64) -> AppResult<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM connections WHERE id = ?1", params![id])
            .map_err(db_err("delete connection"))?;
        Ok(changed > 0)
    }

    /// Look up a connection by id.
    pub fn get_connection(&self, id: i64) -> AppResult<Option<Connection>> {
        self.conn()
            .query_row(
                &format!("{} WHERE c.id = ?1", SELECT_CONNECTION),
                params![id],
                connection_from_row,
            )
            .optional()
            .map_err(db_err("load connection"))
    }

    fn require_connection(&self, id: i64) -> AppResult<Connection> {
        self.get_connection(id)?
            .ok_or_else(|| AppError::NotFound(format!("Connection {}", id)))
    }

    fn query_connections(&self, filter: &str, user_id: i64) -> AppResult<Vec<Connection>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE c.user_id = ?1 {} ORDER BY c.is_default DESC, c.created_at DESC, c.id DESC",
                SELECT_CONNECTION, filter
            ))
            .map_err(db_err("prepare connection query"))?;

        let rows = stmt
            .query_map(params![user_id], connection_from_row)
            .map_err(db_err("query connections"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("read connection"))
    }

    /// A user's connections, default first, then newest first.
    pub fn list_connections(&self, user_id: i64) -> AppResult<Vec<Connection>> {
        self.query_connections("", user_id)
    }

    /// A user's connections whose last test succeeded.
    pub fn list_online_connections(&self, user_id: i64) -> AppResult<Vec<Connection>> {
        self.query_connections("AND c.status = 'online'", user_id)
    }

    /// A user's most recently created default connection, if any.
    pub fn default_connection(&self, user_id: i64) -> AppResult<Option<Connection>> {
        Ok(self
            .query_connections("AND c.is_default = 1", user_id)?
            .into_iter()
            .next())
    }
}

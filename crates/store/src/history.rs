//! Test records and the [`TestLog`] implementation.

use crate::{db_err, format_ts, now, parse_json, parse_ts, to_json, Store};
use promptsmith_core::{AppError, AppResult};
use promptsmith_prompt::{NewTestRecord, TestLog, TestRecord, TestStatus};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

/// Number of records returned by a history query.
pub const HISTORY_LIMIT: usize = 10;

const SELECT_RECORD: &str = "SELECT t.id, t.user_id, t.template_id, t.connection_id, \
     t.rendered_prompt, t.input_variables, t.response, t.status, t.error_message, t.tokens_used, \
     t.duration_ms, COALESCE(NULLIF(c.name, ''), p.name, c.provider), p.name, t.created_at \
     FROM test_records t \
     LEFT JOIN connections c ON c.id = t.connection_id \
     LEFT JOIN providers p ON p.id = c.provider";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TestRecord> {
    let variables: String = row.get(5)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(13)?;

    let status = TestStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("unknown test status '{}'", status).into(),
        )
    })?;

    Ok(TestRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        template_id: row.get(2)?,
        connection_id: row.get(3)?,
        rendered_prompt: row.get(4)?,
        input_variables: parse_json(5, &variables)?,
        response: row.get(6)?,
        status,
        error_message: row.get(8)?,
        tokens_used: row.get(9)?,
        duration_ms: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        connection_name: row.get(11)?,
        provider_name: row.get(12)?,
        created_at: parse_ts(13, &created_at)?,
    })
}

impl Store {
    /// Persist a test record.
    pub fn insert_test_record(&self, record: &NewTestRecord) -> AppResult<TestRecord> {
        let id = {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO test_records (user_id, template_id, connection_id, rendered_prompt,
                    input_variables, response, status, error_message, tokens_used, duration_ms,
                    created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.user_id,
                    record.template_id,
                    record.connection_id,
                    record.rendered_prompt,
                    to_json(&record.input_variables)?,
                    record.response,
                    record.status.as_str(),
                    record.error_message,
                    record.tokens_used,
                    record.duration_ms,
                    format_ts(&now()),
                ],
            )
            .map_err(db_err("insert test record"))?;
            conn.last_insert_rowid()
        };

        self.get_test_record(id)?
            .ok_or_else(|| AppError::NotFound(format!("Test record {}", id)))
    }

    /// Look up a test record by id.
    pub fn get_test_record(&self, id: i64) -> AppResult<Option<TestRecord>> {
        self.conn()
            .query_row(
                &format!("{} WHERE t.id = ?1", SELECT_RECORD),
                params![id],
                record_from_row,
            )
            .optional()
            .map_err(db_err("load test record"))
    }

    /// The most recent [`HISTORY_LIMIT`] records `user_id` made against a
    /// template, newest first.
    pub fn list_test_history(&self, user_id: i64, template_id: i64) -> AppResult<Vec<TestRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "{} WHERE t.template_id = ?1 AND t.user_id = ?2
                 ORDER BY t.created_at DESC, t.id DESC LIMIT ?3",
                SELECT_RECORD
            ))
            .map_err(db_err("prepare history query"))?;

        let rows = stmt
            .query_map(params![template_id, user_id, HISTORY_LIMIT as i64], record_from_row)
            .map_err(db_err("query test history"))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("read test record"))
    }
}

impl TestLog for Store {
    fn record_test(&self, record: NewTestRecord) -> AppResult<TestRecord> {
        self.insert_test_record(&record)
    }

    fn increment_usage(&self, template_id: i64) -> AppResult<()> {
        Store::increment_usage(self, template_id)
    }
}

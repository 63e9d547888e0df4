//! Table and index definitions.

use crate::db_err;
use promptsmith_core::AppResult;
use rusqlite::Connection;

pub(crate) fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS providers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            icon TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            config_schema TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT,
            content TEXT NOT NULL,
            variables TEXT NOT NULL DEFAULT '[]',
            intent TEXT,
            expected_output_format TEXT,
            is_system INTEGER NOT NULL DEFAULT 0,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            usage_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_templates_user_category ON templates(user_id, category);
        CREATE INDEX IF NOT EXISTS idx_templates_user_favorite ON templates(user_id, is_favorite);
        CREATE INDEX IF NOT EXISTS idx_templates_system ON templates(is_system);

        CREATE TABLE IF NOT EXISTS connections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            provider TEXT NOT NULL,
            name TEXT,
            config TEXT NOT NULL DEFAULT '{}',
            is_default INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'offline'
                CHECK (status IN ('offline', 'testing', 'online', 'error')),
            last_error TEXT,
            last_tested_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_connections_user_provider ON connections(user_id, provider);
        CREATE INDEX IF NOT EXISTS idx_connections_user_default ON connections(user_id, is_default);

        CREATE TABLE IF NOT EXISTS test_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            template_id INTEGER NOT NULL,
            connection_id INTEGER NOT NULL,
            rendered_prompt TEXT NOT NULL,
            input_variables TEXT NOT NULL,
            response TEXT,
            status TEXT NOT NULL DEFAULT 'success'
                CHECK (status IN ('success', 'error', 'timeout')),
            error_message TEXT,
            tokens_used INTEGER,
            duration_ms INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE,
            FOREIGN KEY (connection_id) REFERENCES connections(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_test_records_user_template ON test_records(user_id, template_id);
        CREATE INDEX IF NOT EXISTS idx_test_records_template_created ON test_records(template_id, created_at);
        "#,
    )
    .map_err(db_err("create tables"))?;

    tracing::debug!("Initialized database schema");
    Ok(())
}

//! Database schema migrations for realitycheck.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: sessions, usage logs, user stats and the kv table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            kind             TEXT NOT NULL,
            state            TEXT NOT NULL,
            started_at       TEXT NOT NULL,
            resumed_at       TEXT NOT NULL,
            paused_at        TEXT,
            ended_at         TEXT,
            active_ms        INTEGER NOT NULL DEFAULT 0,
            duration_minutes INTEGER,
            rewards_earned   INTEGER,
            metadata         TEXT
        );

        CREATE TABLE IF NOT EXISTS app_usage_logs (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            screen_name      TEXT NOT NULL,
            started_at       TEXT NOT NULL,
            ended_at         TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_stats (
            user_id               TEXT PRIMARY KEY,
            total_offline_minutes INTEGER NOT NULL DEFAULT 0,
            offline_session_count INTEGER NOT NULL DEFAULT 0,
            current_streak        INTEGER NOT NULL DEFAULT 0,
            longest_streak        INTEGER NOT NULL DEFAULT 0,
            last_session_date     TEXT,
            updated_at            TEXT
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user_kind_ended
            ON sessions(user_id, kind, ended_at);
        CREATE INDEX IF NOT EXISTS idx_usage_user_started
            ON app_usage_logs(user_id, started_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: block-list snapshot column and the one-open-session guard.
///
/// The partial unique index makes a second active/paused row for the same
/// user and kind fail at insert time, even across devices sharing the
/// database.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "ALTER TABLE sessions ADD COLUMN blocked_apps TEXT NOT NULL DEFAULT '[]';

        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_open
            ON sessions(user_id, kind) WHERE state != 'ended';",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Offline and touch-grass sessions (open and completed)
//! - In-app usage logs
//! - Per-user aggregate stats
//! - Key-value store for front-end state

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::config::BackendConfig;
use super::data_dir;
use super::migrations;
use super::traits::SessionStore;
use crate::error::{CoreError, StoreError};
use crate::session::{AppUsageLog, Session, SessionKind, SessionState};
use crate::stats::UserStats;

const SESSION_COLUMNS: &str = "id, user_id, kind, state, started_at, resumed_at, paused_at, \
     ended_at, active_ms, duration_minutes, rewards_earned, metadata, blocked_apps";

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database file named in `config` inside the data directory.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &BackendConfig) -> Result<Self, CoreError> {
        let path = data_dir()?.join(&config.database_file);
        Ok(Self::open_at(path)?)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn session_state(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT state FROM sessions WHERE id = ?1", params![id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }
}

impl SessionStore for Database {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn is_healthy(&self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let blocked_apps = serde_json::to_string(&session.blocked_apps)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let result = self.conn.execute(
            &format!(
                "INSERT INTO sessions ({SESSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                session.id,
                session.user_id,
                session.kind.as_str(),
                session.state.as_str(),
                ts(session.started_at),
                ts(session.resumed_at),
                session.paused_at.map(ts),
                session.ended_at.map(ts),
                session.active_ms as i64,
                session.duration_minutes.map(|m| m as i64),
                session.rewards_earned.map(|r| r as i64),
                session.metadata.as_ref().map(|m| m.to_string()),
                blocked_apps,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            // Only the partial unique index (`idx_sessions_one_open`) reports
            // SQLITE_CONSTRAINT_UNIQUE on this table.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::ActiveSessionExists {
                    user_id: session.user_id.clone(),
                    kind: session.kind,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let blocked_apps = serde_json::to_string(&session.blocked_apps)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let changed = self.conn.execute(
            "UPDATE sessions SET
                state = ?2, resumed_at = ?3, paused_at = ?4, ended_at = ?5,
                active_ms = ?6, duration_minutes = ?7, rewards_earned = ?8,
                metadata = ?9, blocked_apps = ?10
             WHERE id = ?1 AND state != 'ended'",
            params![
                session.id,
                session.state.as_str(),
                ts(session.resumed_at),
                session.paused_at.map(ts),
                session.ended_at.map(ts),
                session.active_ms as i64,
                session.duration_minutes.map(|m| m as i64),
                session.rewards_earned.map(|r| r as i64),
                session.metadata.as_ref().map(|m| m.to_string()),
                blocked_apps,
            ],
        )?;
        if changed > 0 {
            return Ok(());
        }
        match self.session_state(&session.id)? {
            Some(_) => Err(StoreError::SessionFinalized {
                id: session.id.clone(),
            }),
            None => Err(StoreError::NotFound {
                id: session.id.clone(),
            }),
        }
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()?)
    }

    fn active_session(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE user_id = ?1 AND kind = ?2 AND state != 'ended'
                     ORDER BY started_at DESC LIMIT 1"
                ),
                params![user_id, kind.as_str()],
                session_from_row,
            )
            .optional()?)
    }

    fn completed_sessions(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Vec<Session>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE user_id = ?1 AND kind = ?2 AND state = 'ended'
             ORDER BY ended_at ASC"
        ))?;
        let rows = stmt.query_map(params![user_id, kind.as_str()], session_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn insert_usage_log(&self, log: &AppUsageLog) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO app_usage_logs (id, user_id, screen_name, started_at, ended_at, duration_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                log.id,
                log.user_id,
                log.screen_name,
                ts(log.started_at),
                ts(log.ended_at),
                log.duration_minutes as i64,
            ],
        )?;
        Ok(())
    }

    fn usage_logs(&self, user_id: &str) -> Result<Vec<AppUsageLog>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, screen_name, started_at, ended_at, duration_minutes
             FROM app_usage_logs
             WHERE user_id = ?1
             ORDER BY started_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(AppUsageLog {
                id: row.get(0)?,
                user_id: row.get(1)?,
                screen_name: row.get(2)?,
                started_at: timestamp(row, 3)?,
                ended_at: timestamp(row, 4)?,
                duration_minutes: row.get::<_, i64>(5)? as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT user_id, total_offline_minutes, offline_session_count,
                        current_streak, longest_streak, last_session_date, updated_at
                 FROM user_stats WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let last_session_date = row
                        .get::<_, Option<String>>(5)?
                        .map(|s| {
                            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                                .map_err(|e| conversion_error(5, e))
                        })
                        .transpose()?;
                    Ok(UserStats {
                        user_id: row.get(0)?,
                        total_offline_minutes: row.get::<_, i64>(1)? as u64,
                        offline_session_count: row.get::<_, i64>(2)? as u64,
                        current_streak: row.get(3)?,
                        longest_streak: row.get(4)?,
                        last_session_date,
                        updated_at: optional_timestamp(row, 6)?,
                    })
                },
            )
            .optional()?)
    }

    fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO user_stats (user_id, total_offline_minutes, offline_session_count,
                                     current_streak, longest_streak, last_session_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                total_offline_minutes = excluded.total_offline_minutes,
                offline_session_count = excluded.offline_session_count,
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                last_session_date = excluded.last_session_date,
                updated_at = excluded.updated_at",
            params![
                stats.user_id,
                stats.total_offline_minutes as i64,
                stats.offline_session_count as i64,
                stats.current_streak,
                stats.longest_streak,
                stats.last_session_date.map(|d| d.format("%Y-%m-%d").to_string()),
                stats.updated_at.map(ts),
            ],
        )?;
        Ok(())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let kind: String = row.get(2)?;
    let state: String = row.get(3)?;
    let metadata: Option<serde_json::Value> = row
        .get::<_, Option<String>>(11)?
        .map(|raw| serde_json::from_str(&raw).map_err(|e| conversion_error(11, e)))
        .transpose()?;
    let blocked_apps: String = row.get(12)?;

    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: kind.parse().map_err(|e| conversion_error(2, e))?,
        state: state
            .parse::<SessionState>()
            .map_err(|e| conversion_error(3, e))?,
        started_at: timestamp(row, 4)?,
        resumed_at: timestamp(row, 5)?,
        paused_at: optional_timestamp(row, 6)?,
        ended_at: optional_timestamp(row, 7)?,
        active_ms: row.get::<_, i64>(8)?.max(0) as u64,
        duration_minutes: row.get::<_, Option<i64>>(9)?.map(|m| m.max(0) as u64),
        rewards_earned: row.get::<_, Option<i64>>(10)?.map(|r| r.max(0) as u64),
        metadata,
        blocked_apps: serde_json::from_str(&blocked_apps).map_err(|e| conversion_error(12, e))?,
    })
}

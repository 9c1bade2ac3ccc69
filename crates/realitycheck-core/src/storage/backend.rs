//! Backend selection with mock fallback.
//!
//! The database is checked once when the backend is built. If it cannot be
//! opened (or the config forces offline mode), the process keeps using an
//! in-memory store seeded with mock data for the rest of its life.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::config::Config;
use super::database::Database;
use super::memory::MemoryStore;
use super::traits::SessionStore;
use crate::error::StoreError;
use crate::session::{AppUsageLog, Session, SessionKind};
use crate::stats::UserStats;

/// User id the mock dataset belongs to when nobody is signed in.
pub const MOCK_USER_ID: &str = "demo-user";

pub enum Backend {
    Sqlite(Database),
    Mock(MemoryStore),
}

impl Backend {
    pub fn connect(config: &Config, now: DateTime<Utc>) -> Self {
        let mock_user = config
            .user
            .current_user_id
            .as_deref()
            .unwrap_or(MOCK_USER_ID);

        if config.backend.force_offline {
            info!("offline mode forced by configuration, using mock data");
            return Backend::Mock(MemoryStore::with_mock_data(mock_user, now));
        }

        match Database::open(&config.backend) {
            Ok(db) if db.is_healthy() => Backend::Sqlite(db),
            Ok(_) => {
                warn!("database failed its health check, using mock data");
                Backend::Mock(MemoryStore::with_mock_data(mock_user, now))
            }
            Err(e) => {
                warn!(error = %e, "database unavailable, using mock data");
                Backend::Mock(MemoryStore::with_mock_data(mock_user, now))
            }
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Backend::Mock(_))
    }

    fn store(&self) -> &dyn SessionStore {
        match self {
            Backend::Sqlite(db) => db,
            Backend::Mock(mem) => mem,
        }
    }
}

impl SessionStore for Backend {
    fn name(&self) -> &str {
        self.store().name()
    }

    fn is_healthy(&self) -> bool {
        self.store().is_healthy()
    }

    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.store().insert_session(session)
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        self.store().update_session(session)
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.store().get_session(id)
    }

    fn active_session(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Option<Session>, StoreError> {
        self.store().active_session(user_id, kind)
    }

    fn completed_sessions(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Vec<Session>, StoreError> {
        self.store().completed_sessions(user_id, kind)
    }

    fn insert_usage_log(&self, log: &AppUsageLog) -> Result<(), StoreError> {
        self.store().insert_usage_log(log)
    }

    fn usage_logs(&self, user_id: &str) -> Result<Vec<AppUsageLog>, StoreError> {
        self.store().usage_logs(user_id)
    }

    fn user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StoreError> {
        self.store().user_stats(user_id)
    }

    fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), StoreError> {
        self.store().upsert_user_stats(stats)
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store().kv_get(key)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store().kv_set(key, value)
    }

    fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.store().kv_delete(key)
    }
}

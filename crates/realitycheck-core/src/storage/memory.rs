//! In-memory store.
//!
//! Backs tests and the offline fallback. `with_mock_data` seeds a short
//! history so the front end has something to show when the database is
//! unreachable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::traits::SessionStore;
use crate::error::StoreError;
use crate::session::{AppUsageLog, Session, SessionKind};
use crate::stats::{aggregate, UserStats};

#[derive(Debug, Default)]
struct Inner {
    sessions: Vec<Session>,
    usage: Vec<AppUsageLog>,
    stats: HashMap<String, UserStats>,
    kv: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with a few days of history for `user_id`.
    pub fn with_mock_data(user_id: &str, now: DateTime<Utc>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for (days_ago, minutes) in [(3, 45), (2, 30), (1, 60)] {
                let start = now - Duration::days(days_ago) - Duration::minutes(minutes);
                let mut session = Session::new(user_id, SessionKind::Offline, start);
                session.blocked_apps = vec!["Instagram".into(), "TikTok".into()];
                if session.finish(start + Duration::minutes(minutes), 1.5).is_ok() {
                    inner.sessions.push(session);
                }
            }

            let stroll_start = now - Duration::days(1) - Duration::hours(3);
            let mut stroll = Session::new(user_id, SessionKind::TouchGrass, stroll_start);
            if stroll.finish(stroll_start + Duration::minutes(20), 1.5).is_ok() {
                inner.sessions.push(stroll);
            }

            let offline: Vec<Session> = inner
                .sessions
                .iter()
                .filter(|s| s.kind == SessionKind::Offline)
                .cloned()
                .collect();
            let mut stats = UserStats::from_totals(user_id, &aggregate(&offline));
            stats.updated_at = Some(now - Duration::days(1));
            inner.stats.insert(user_id.to_string(), stats);

            for (screen, minutes, hours_ago) in [("dashboard", 4, 5), ("community", 12, 4)] {
                let started_at = now - Duration::hours(hours_ago);
                inner.usage.push(AppUsageLog {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    screen_name: screen.to_string(),
                    started_at,
                    ended_at: started_at + Duration::minutes(minutes),
                    duration_minutes: minutes as u64,
                });
            }
        }
        store
    }

    /// Make every subsequent call fail, to exercise error paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".into()));
        }
        Ok(self.lock())
    }
}

impl SessionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_healthy(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }

    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.check()?;
        if session.is_open()
            && inner.sessions.iter().any(|s| {
                s.is_open() && s.user_id == session.user_id && s.kind == session.kind
            })
        {
            return Err(StoreError::ActiveSessionExists {
                user_id: session.user_id.clone(),
                kind: session.kind,
            });
        }
        inner.sessions.push(session.clone());
        Ok(())
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.check()?;
        let existing = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| StoreError::NotFound {
                id: session.id.clone(),
            })?;
        if existing.is_completed() {
            return Err(StoreError::SessionFinalized {
                id: session.id.clone(),
            });
        }
        *existing = session.clone();
        Ok(())
    }

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.check()?.sessions.iter().find(|s| s.id == id).cloned())
    }

    fn active_session(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .check()?
            .sessions
            .iter()
            .find(|s| s.is_open() && s.user_id == user_id && s.kind == kind)
            .cloned())
    }

    fn completed_sessions(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .check()?
            .sessions
            .iter()
            .filter(|s| s.is_completed() && s.user_id == user_id && s.kind == kind)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.ended_at);
        Ok(sessions)
    }

    fn insert_usage_log(&self, log: &AppUsageLog) -> Result<(), StoreError> {
        self.check()?.usage.push(log.clone());
        Ok(())
    }

    fn usage_logs(&self, user_id: &str) -> Result<Vec<AppUsageLog>, StoreError> {
        let mut logs: Vec<AppUsageLog> = self
            .check()?
            .usage
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(logs)
    }

    fn user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StoreError> {
        Ok(self.check()?.stats.get(user_id).cloned())
    }

    fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), StoreError> {
        self.check()?
            .stats
            .insert(stats.user_id.clone(), stats.clone());
        Ok(())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.check()?.kv.get(key).cloned())
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?.kv.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_second_open_session() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_session(&Session::new("u1", SessionKind::Offline, now))
            .unwrap();
        let err = store
            .insert_session(&Session::new("u1", SessionKind::Offline, now))
            .unwrap_err();
        assert!(matches!(err, StoreError::ActiveSessionExists { .. }));

        // Other kinds and other users are independent.
        store
            .insert_session(&Session::new("u1", SessionKind::TouchGrass, now))
            .unwrap();
        store
            .insert_session(&Session::new("u2", SessionKind::Offline, now))
            .unwrap();
    }

    #[test]
    fn ended_sessions_are_immutable() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut session = Session::new("u1", SessionKind::Offline, now);
        store.insert_session(&session).unwrap();
        session.finish(now + Duration::minutes(3), 1.5).unwrap();
        store.update_session(&session).unwrap();

        let mut tampered = session.clone();
        tampered.ended_at = Some(now + Duration::minutes(30));
        assert!(matches!(
            store.update_session(&tampered),
            Err(StoreError::SessionFinalized { .. })
        ));
        assert_eq!(
            store.get_session(&session.id).unwrap().unwrap().ended_at,
            Some(now + Duration::minutes(3))
        );
    }

    #[test]
    fn mock_data_has_consistent_stats() {
        let now = Utc::now();
        let store = MemoryStore::with_mock_data("demo", now);
        let stats = store.user_stats("demo").unwrap().unwrap();
        assert_eq!(stats.offline_session_count, 3);
        assert_eq!(stats.total_offline_minutes, 135);
        assert_eq!(stats.longest_streak, 3);
        assert!(store.active_session("demo", SessionKind::Offline).unwrap().is_none());
        assert_eq!(store.usage_logs("demo").unwrap().len(), 2);
        assert_eq!(
            store
                .completed_sessions("demo", SessionKind::TouchGrass)
                .unwrap()[0]
                .rewards_earned,
            Some(30)
        );
    }

    #[test]
    fn failing_store_errors() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(!store.is_healthy());
        assert!(store.kv_get("k").is_err());
        store.set_failing(false);
        assert!(store.kv_get("k").unwrap().is_none());
    }
}

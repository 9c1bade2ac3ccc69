use crate::error::StoreError;
use crate::session::{AppUsageLog, Session, SessionKind};
use crate::stats::UserStats;

/// Every persistence backend implements this trait.
///
/// Reads that find nothing return `Ok(None)`; only real failures are
/// errors. Implementations must reject a second open session for the same
/// user and kind, and must refuse to modify an ended session.
pub trait SessionStore {
    /// Short identifier for logs ("sqlite", "memory").
    fn name(&self) -> &str;

    /// Whether the backend passed its last health check.
    fn is_healthy(&self) -> bool;

    // Sessions

    fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Overwrite every mutable column of an existing session.
    fn update_session(&self, session: &Session) -> Result<(), StoreError>;

    fn get_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// The open (active or paused) session of this kind, if any.
    fn active_session(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Option<Session>, StoreError>;

    /// Ended sessions, oldest end first.
    fn completed_sessions(
        &self,
        user_id: &str,
        kind: SessionKind,
    ) -> Result<Vec<Session>, StoreError>;

    // App usage

    fn insert_usage_log(&self, log: &AppUsageLog) -> Result<(), StoreError>;

    /// Usage logs, newest first.
    fn usage_logs(&self, user_id: &str) -> Result<Vec<AppUsageLog>, StoreError>;

    // Aggregates

    fn user_stats(&self, user_id: &str) -> Result<Option<UserStats>, StoreError>;

    fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), StoreError>;

    // Key-value state for front ends

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn kv_delete(&self, key: &str) -> Result<(), StoreError>;
}

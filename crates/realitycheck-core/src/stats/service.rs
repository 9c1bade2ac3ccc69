//! Keeps the persisted `UserStats` row in step with completed sessions.
//!
//! Store failures never propagate from here: they are logged and the
//! caller gets the previously cached stats back.

use tracing::{debug, info, warn};

use super::aggregator::{aggregate, apply_completed, UserStats};
use crate::session::{Session, SessionKind};
use crate::storage::SessionStore;

pub struct StatsService<'a, S: SessionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SessionStore + ?Sized> StatsService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Read the stored stats. Missing rows and read failures both yield
    /// empty stats (the latter with a warning).
    pub fn current(&self, user_id: &str) -> UserStats {
        match self.store.user_stats(user_id) {
            Ok(Some(stats)) => stats,
            Ok(None) => UserStats::empty(user_id),
            Err(e) => {
                warn!(user_id, error = %e, "failed to read user stats");
                UserStats::empty(user_id)
            }
        }
    }

    /// Fold a just-completed offline session into the user's stats.
    ///
    /// Sessions of other kinds, and sessions that are still open, leave
    /// the stats untouched.
    pub fn refresh_after(&self, session: &Session, cached: Option<&UserStats>) -> UserStats {
        let previous = match self.store.user_stats(&session.user_id) {
            Ok(Some(stats)) => stats,
            Ok(None) => UserStats::empty(&session.user_id),
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "failed to read user stats, using cached");
                return fallback(cached, &session.user_id);
            }
        };

        let ended_at = match (session.kind, session.ended_at) {
            (SessionKind::Offline, Some(ended_at)) if session.is_completed() => ended_at,
            _ => {
                debug!(session_id = %session.id, kind = %session.kind, "session does not affect stats");
                return previous;
            }
        };

        let mut next = apply_completed(
            &previous,
            ended_at.date_naive(),
            session.duration_minutes.unwrap_or(0),
        );
        next.updated_at = Some(ended_at);

        match self.store.upsert_user_stats(&next) {
            Ok(()) => {
                info!(
                    user_id = %next.user_id,
                    current_streak = next.current_streak,
                    total_minutes = next.total_offline_minutes,
                    "user stats updated"
                );
                next
            }
            Err(e) => {
                warn!(user_id = %session.user_id, error = %e, "failed to write user stats");
                previous
            }
        }
    }

    /// Rebuild the stats row from every completed offline session.
    pub fn recompute(&self, user_id: &str, cached: Option<&UserStats>) -> UserStats {
        let sessions = match self.store.completed_sessions(user_id, SessionKind::Offline) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(user_id, error = %e, "failed to read sessions for recompute");
                return fallback(cached, user_id);
            }
        };

        let totals = aggregate(&sessions);
        let mut stats = UserStats::from_totals(user_id, &totals);
        stats.updated_at = sessions.iter().filter_map(|s| s.ended_at).max();

        if let Err(e) = self.store.upsert_user_stats(&stats) {
            warn!(user_id, error = %e, "failed to write recomputed stats");
            return fallback(cached, user_id);
        }
        stats
    }
}

fn fallback(cached: Option<&UserStats>, user_id: &str) -> UserStats {
    cached.cloned().unwrap_or_else(|| UserStats::empty(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{DateTime, Duration, Utc};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-02T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn finished(kind: SessionKind, start: DateTime<Utc>, minutes: i64) -> Session {
        let mut session = Session::new("u1", kind, start);
        session.finish(start + Duration::minutes(minutes), 1.5).unwrap();
        session
    }

    #[test]
    fn refresh_extends_streak_from_yesterday() {
        let store = MemoryStore::new();
        store
            .upsert_user_stats(&UserStats {
                current_streak: 3,
                longest_streak: 3,
                last_session_date: Some((t0() - Duration::days(1)).date_naive()),
                offline_session_count: 3,
                total_offline_minutes: 90,
                ..UserStats::empty("u1")
            })
            .unwrap();

        let service = StatsService::new(&store);
        let stats = service.refresh_after(&finished(SessionKind::Offline, t0(), 25), None);
        assert_eq!(stats.current_streak, 4);
        assert_eq!(stats.total_offline_minutes, 115);
        assert_eq!(store.user_stats("u1").unwrap(), Some(stats));
    }

    #[test]
    fn refresh_after_three_day_gap_resets() {
        let store = MemoryStore::new();
        store
            .upsert_user_stats(&UserStats {
                current_streak: 7,
                longest_streak: 7,
                last_session_date: Some((t0() - Duration::days(3)).date_naive()),
                ..UserStats::empty("u1")
            })
            .unwrap();

        let stats =
            StatsService::new(&store).refresh_after(&finished(SessionKind::Offline, t0(), 5), None);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 7);
    }

    #[test]
    fn touch_grass_sessions_do_not_touch_offline_stats() {
        let store = MemoryStore::new();
        let stats = StatsService::new(&store)
            .refresh_after(&finished(SessionKind::TouchGrass, t0(), 30), None);
        assert_eq!(stats, UserStats::empty("u1"));
        assert_eq!(store.user_stats("u1").unwrap(), None);
    }

    #[test]
    fn read_failure_falls_back_to_cache() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let cached = UserStats {
            current_streak: 2,
            ..UserStats::empty("u1")
        };
        let stats = StatsService::new(&store)
            .refresh_after(&finished(SessionKind::Offline, t0(), 30), Some(&cached));
        assert_eq!(stats, cached);
        assert_eq!(StatsService::new(&store).recompute("u1", Some(&cached)), cached);
    }

    #[test]
    fn recompute_matches_history() {
        let store = MemoryStore::new();
        for (offset, minutes) in [(0, 10), (1, 20), (2, 30)] {
            let session = finished(SessionKind::Offline, t0() + Duration::days(offset), minutes);
            store.insert_session(&session).unwrap();
        }
        let stats = StatsService::new(&store).recompute("u1", None);
        assert_eq!(stats.offline_session_count, 3);
        assert_eq!(stats.total_offline_minutes, 60);
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(
            stats.updated_at,
            Some(t0() + Duration::days(2) + Duration::minutes(30))
        );
    }
}

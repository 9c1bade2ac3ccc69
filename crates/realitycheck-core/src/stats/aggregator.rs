//! Streak and total calculations.
//!
//! Two entry points that agree with each other:
//! - [`apply_completed`] folds one finished session into existing stats
//! - [`aggregate`] recomputes everything from the completed sessions
//!
//! Calendar days are UTC dates of the session end.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Cumulative offline-session counters, one row per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_offline_minutes: u64,
    pub offline_session_count: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_session_date: Option<NaiveDate>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserStats {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            total_offline_minutes: 0,
            offline_session_count: 0,
            current_streak: 0,
            longest_streak: 0,
            last_session_date: None,
            updated_at: None,
        }
    }

    pub fn from_totals(user_id: impl Into<String>, totals: &SessionTotals) -> Self {
        Self {
            user_id: user_id.into(),
            total_offline_minutes: totals.total_minutes,
            offline_session_count: totals.session_count,
            current_streak: totals.current_streak,
            longest_streak: totals.longest_streak,
            last_session_date: totals.last_session_date,
            updated_at: None,
        }
    }
}

/// Result of a full recompute over completed sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub total_minutes: u64,
    pub session_count: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_session_date: Option<NaiveDate>,
}

/// Streak after completing a session on `completed_on`.
///
/// Consecutive day extends the streak, same day keeps it, anything else
/// starts over at 1. A date earlier than `last` leaves the streak alone.
pub fn next_streak(current: u32, last: Option<NaiveDate>, completed_on: NaiveDate) -> u32 {
    match last {
        Some(last) if completed_on <= last => current,
        Some(last) if last.succ_opt() == Some(completed_on) => current.saturating_add(1),
        _ => 1,
    }
}

/// Fold one completed session into `stats`.
pub fn apply_completed(stats: &UserStats, completed_on: NaiveDate, minutes: u64) -> UserStats {
    let current_streak = next_streak(stats.current_streak, stats.last_session_date, completed_on);
    let last_session_date = match stats.last_session_date {
        Some(last) if last > completed_on => Some(last),
        _ => Some(completed_on),
    };
    UserStats {
        user_id: stats.user_id.clone(),
        total_offline_minutes: stats.total_offline_minutes.saturating_add(minutes),
        offline_session_count: stats.offline_session_count.saturating_add(1),
        current_streak,
        longest_streak: stats.longest_streak.max(current_streak),
        last_session_date,
        updated_at: stats.updated_at,
    }
}

/// Recompute totals and streaks from scratch. Open sessions are ignored.
pub fn aggregate(sessions: &[Session]) -> SessionTotals {
    let mut totals = SessionTotals::default();
    let mut days: Vec<NaiveDate> = Vec::new();

    for session in sessions.iter().filter(|s| s.is_completed()) {
        totals.session_count += 1;
        totals.total_minutes = totals
            .total_minutes
            .saturating_add(session.duration_minutes.unwrap_or(0));
        if let Some(ended_at) = session.ended_at {
            days.push(ended_at.date_naive());
        }
    }

    days.sort_unstable();
    days.dedup();

    let mut run: u32 = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = next_streak(run, previous, day);
        totals.longest_streak = totals.longest_streak.max(run);
        previous = Some(day);
    }
    totals.current_streak = run;
    totals.last_session_date = previous;
    totals
}

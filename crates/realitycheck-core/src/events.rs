use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::AppState;
use crate::session::{PlantStage, SessionKind};
use crate::stats::UserStats;

/// Every state change in the system produces an Event.
/// Front ends render them; tests assert on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: String,
        kind: SessionKind,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        blocked_apps: Vec<String>,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: String,
        kind: SessionKind,
        active_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: String,
        kind: SessionKind,
        active_secs: u64,
        at: DateTime<Utc>,
    },
    SessionEnded {
        session_id: String,
        kind: SessionKind,
        duration_minutes: u64,
        rewards_earned: Option<u64>,
        at: DateTime<Utc>,
    },
    /// Touch-grass: the plant grew on a growth boundary.
    GrowthPulse {
        session_id: String,
        elapsed_secs: u64,
        growth_points: u32,
        at: DateTime<Utc>,
    },
    /// Touch-grass: periodic level evaluation.
    LevelChecked {
        session_id: String,
        elapsed_minutes: u64,
        level: u32,
        at: DateTime<Utc>,
    },
    LevelUp {
        session_id: String,
        level: u32,
        stage: PlantStage,
        at: DateTime<Utc>,
    },
    /// Touch-grass: the phone was put away during an active stroll.
    BonusPulse {
        session_id: String,
        bonus_points: u32,
        at: DateTime<Utc>,
    },
    UsageStarted {
        screen_name: String,
        at: DateTime<Utc>,
    },
    UsageLogged {
        screen_name: String,
        duration_minutes: u64,
        at: DateTime<Utc>,
    },
    /// A usage window below the minimum length was dropped.
    UsageDiscarded {
        screen_name: String,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    AppStateChanged {
        from: AppState,
        to: AppState,
        at: DateTime<Utc>,
    },
    StatsUpdated {
        user_id: String,
        total_offline_minutes: u64,
        offline_session_count: u64,
        current_streak: u32,
        longest_streak: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn stats_updated(stats: &UserStats, at: DateTime<Utc>) -> Self {
        Event::StatsUpdated {
            user_id: stats.user_id.clone(),
            total_offline_minutes: stats.total_offline_minutes,
            offline_session_count: stats.offline_session_count,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            at,
        }
    }
}

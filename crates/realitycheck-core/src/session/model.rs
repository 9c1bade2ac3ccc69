//! Session records and their state machine.
//!
//! A session is `Active`, `Paused` or `Ended`. Active time is accumulated
//! per running stretch: `active_ms` holds the folded total and
//! `resumed_at` marks where the current stretch began, so time spent
//! paused never counts toward the duration.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::millis_between;
use crate::error::{CoreError, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Time off the phone.
    Offline,
    /// Gamified outdoor stroll.
    TouchGrass,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Offline => "offline",
            SessionKind::TouchGrass => "touch_grass",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(SessionKind::Offline),
            "touch_grass" | "touch-grass" => Ok(SessionKind::TouchGrass),
            other => Err(ValidationError::InvalidValue {
                field: "kind".into(),
                message: format!("unknown session kind '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Paused,
    Ended,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Ended => "ended",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionState::Active),
            "paused" => Ok(SessionState::Paused),
            "ended" => Ok(SessionState::Ended),
            other => Err(ValidationError::InvalidValue {
                field: "state".into(),
                message: format!("unknown session state '{other}'"),
            }),
        }
    }
}

/// One offline or touch-grass session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub kind: SessionKind,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    /// Start of the current (or last) active stretch.
    pub resumed_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Active time folded in from finished stretches.
    pub active_ms: u64,
    pub duration_minutes: Option<u64>,
    /// Touch-grass only.
    pub rewards_earned: Option<u64>,
    /// Snapshot captured at end, e.g. plant growth.
    pub metadata: Option<serde_json::Value>,
    /// Offline only: apps selected from the block list at start.
    #[serde(default)]
    pub blocked_apps: Vec<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, kind: SessionKind, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind,
            state: SessionState::Active,
            started_at: now,
            resumed_at: now,
            paused_at: None,
            ended_at: None,
            active_ms: 0,
            duration_minutes: None,
            rewards_earned: None,
            metadata: None,
            blocked_apps: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Ended
    }

    /// Active or paused.
    pub fn is_open(&self) -> bool {
        self.state != SessionState::Ended
    }

    /// Total active milliseconds as of `now`.
    pub fn active_ms_at(&self, now: DateTime<Utc>) -> u64 {
        match self.state {
            SessionState::Active => self.active_ms + millis_between(self.resumed_at, now),
            SessionState::Paused | SessionState::Ended => self.active_ms,
        }
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        self.active_ms_at(now) / 1000
    }

    /// Active -> Paused.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state != SessionState::Active {
            return Err(self.invalid("pause"));
        }
        self.active_ms = self.active_ms_at(now);
        self.paused_at = Some(now);
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Paused -> Active.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(self.invalid("resume"));
        }
        self.paused_at = None;
        self.resumed_at = now;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Active|Paused -> Ended. Derives the duration; touch-grass sessions
    /// also get their reward.
    pub fn finish(&mut self, now: DateTime<Utc>, reward_multiplier: f64) -> Result<()> {
        if self.state == SessionState::Ended {
            return Err(self.invalid("end"));
        }
        if now < self.started_at {
            return Err(ValidationError::InvalidTimeRange {
                start: self.started_at,
                end: now,
            }
            .into());
        }
        self.active_ms = self.active_ms_at(now);
        let minutes = self.active_ms / 60_000;
        self.duration_minutes = Some(minutes);
        if self.kind == SessionKind::TouchGrass {
            self.rewards_earned = Some(rewards_for(minutes, reward_multiplier));
        }
        self.paused_at = None;
        self.ended_at = Some(now);
        self.state = SessionState::Ended;
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}

/// Rewards for a completed stroll: `floor(minutes * multiplier)`.
pub fn rewards_for(minutes: u64, multiplier: f64) -> u64 {
    (minutes as f64 * multiplier.max(0.0)).floor() as u64
}

/// A finished in-app measurement window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUsageLog {
    pub id: String,
    pub user_id: String,
    pub screen_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn duration_is_floor_of_active_minutes() {
        let mut session = Session::new("u1", SessionKind::Offline, t0());
        session.finish(t0() + Duration::seconds(179), 1.5).unwrap();
        assert_eq!(session.duration_minutes, Some(2));
        assert_eq!(session.rewards_earned, None);
        assert!(session.is_completed());
        assert_eq!(session.ended_at, Some(t0() + Duration::seconds(179)));
    }

    #[test]
    fn paused_time_is_excluded() {
        let mut session = Session::new("u1", SessionKind::Offline, t0());
        session.pause(t0() + Duration::minutes(5)).unwrap();
        assert_eq!(session.state, SessionState::Paused);
        session.resume(t0() + Duration::minutes(65)).unwrap();
        session.finish(t0() + Duration::minutes(70), 1.5).unwrap();
        assert_eq!(session.duration_minutes, Some(10));
    }

    #[test]
    fn ending_while_paused_uses_frozen_time() {
        let mut session = Session::new("u1", SessionKind::TouchGrass, t0());
        session.pause(t0() + Duration::minutes(10)).unwrap();
        session.finish(t0() + Duration::minutes(30), 1.5).unwrap();
        assert_eq!(session.duration_minutes, Some(10));
        assert_eq!(session.rewards_earned, Some(15));
        assert_eq!(session.paused_at, None);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut session = Session::new("u1", SessionKind::Offline, t0());
        assert!(matches!(
            session.resume(t0()),
            Err(CoreError::InvalidTransition { action: "resume", .. })
        ));
        session.finish(t0() + Duration::minutes(1), 1.5).unwrap();
        assert!(session.pause(t0()).is_err());
        assert!(session.finish(t0() + Duration::minutes(2), 1.5).is_err());
        assert_eq!(session.ended_at, Some(t0() + Duration::minutes(1)));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut session = Session::new("u1", SessionKind::Offline, t0());
        assert!(matches!(
            session.finish(t0() - Duration::seconds(1), 1.5),
            Err(CoreError::Validation(ValidationError::InvalidTimeRange { .. }))
        ));
        assert!(session.is_open());
    }

    #[test]
    fn rewards_round_down() {
        assert_eq!(rewards_for(10, 1.5), 15);
        assert_eq!(rewards_for(2, 1.5), 3);
        assert_eq!(rewards_for(1, 1.5), 1);
        assert_eq!(rewards_for(0, 1.5), 0);
    }

    #[test]
    fn kind_and_state_parse() {
        assert_eq!("touch-grass".parse::<SessionKind>().unwrap(), SessionKind::TouchGrass);
        assert_eq!("offline".parse::<SessionKind>().unwrap(), SessionKind::Offline);
        assert!("walk".parse::<SessionKind>().is_err());
        assert_eq!("paused".parse::<SessionState>().unwrap(), SessionState::Paused);
        assert_eq!(SessionKind::TouchGrass.to_string(), "touch_grass");
    }
}

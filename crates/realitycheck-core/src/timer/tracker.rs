//! Interval tracker.
//!
//! A wall-clock-based elapsed-time counter. It does not own a thread or a
//! timer; the caller feeds it instants (usually from a [`Ticker`]) and it
//! reports the milestones crossed since the previous tick.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> Stopped
//! ```
//!
//! Only time spent in `Running` is counted. Pausing folds the current
//! stretch into the accumulated total, so resuming never re-counts the
//! paused interval.
//!
//! [`Ticker`]: super::Ticker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::millis_between;
use crate::storage::TrackingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// A boundary crossed by the elapsed counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Milestone {
    /// Fired on every multiple of the growth interval.
    Growth { at_secs: u64 },
    /// Fired on every multiple of the level-check interval.
    LevelCheck { elapsed_minutes: u64 },
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tick {
    pub elapsed_secs: u64,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalTracker {
    state: TrackerState,
    /// Active milliseconds folded in from completed running stretches.
    accumulated_ms: u64,
    /// Start of the current running stretch.
    #[serde(default)]
    running_since: Option<DateTime<Utc>>,
    /// Elapsed seconds already reported by `tick()`.
    reported_secs: u64,
    growth_interval_secs: u64,
    level_check_secs: u64,
}

impl IntervalTracker {
    pub fn new(growth_interval_secs: u64, level_check_secs: u64) -> Self {
        Self {
            state: TrackerState::Idle,
            accumulated_ms: 0,
            running_since: None,
            reported_secs: 0,
            growth_interval_secs,
            level_check_secs,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.growth_interval_secs, config.level_check_secs)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Active milliseconds as of `now`, without mutating the tracker.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let running = match (self.state, self.running_since) {
            (TrackerState::Running, Some(since)) => millis_between(since, now),
            _ => 0,
        };
        self.accumulated_ms + running
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        self.elapsed_ms(now) / 1000
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting from zero. Returns false if already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        self.resume_from(0, now)
    }

    /// Start counting from an already-recorded amount of active time,
    /// e.g. when re-attaching to a session that began earlier.
    ///
    /// Milestones at or below the seeded value are treated as reported.
    pub fn resume_from(&mut self, active_ms: u64, now: DateTime<Utc>) -> bool {
        match self.state {
            TrackerState::Idle | TrackerState::Stopped => {
                self.accumulated_ms = active_ms;
                self.reported_secs = active_ms / 1000;
                self.running_since = Some(now);
                self.state = TrackerState::Running;
                true
            }
            TrackerState::Running | TrackerState::Paused => false,
        }
    }

    /// Treat every milestone at or below `secs` as already reported.
    pub fn set_reported_secs(&mut self, secs: u64) {
        self.reported_secs = secs;
    }

    /// Freeze the counter.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != TrackerState::Running {
            return false;
        }
        self.flush_elapsed(now);
        self.running_since = None;
        self.state = TrackerState::Paused;
        true
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != TrackerState::Paused {
            return false;
        }
        self.running_since = Some(now);
        self.state = TrackerState::Running;
        true
    }

    /// Stop permanently and return the final elapsed seconds.
    pub fn stop(&mut self, now: DateTime<Utc>) -> u64 {
        if self.state == TrackerState::Running {
            self.flush_elapsed(now);
        }
        self.running_since = None;
        self.state = TrackerState::Stopped;
        self.accumulated_ms / 1000
    }

    /// Call periodically. Reports every boundary crossed since the last
    /// tick, in chronological order; each boundary fires exactly once.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.state == TrackerState::Running {
            self.flush_elapsed(now);
        }
        let elapsed_secs = self.accumulated_ms / 1000;
        if elapsed_secs <= self.reported_secs {
            return Tick {
                elapsed_secs,
                milestones: Vec::new(),
            };
        }

        let mut crossed: Vec<(u64, Milestone)> =
            boundaries(self.reported_secs, elapsed_secs, self.growth_interval_secs)
                .map(|at_secs| (at_secs, Milestone::Growth { at_secs }))
                .collect();
        crossed.extend(
            boundaries(self.reported_secs, elapsed_secs, self.level_check_secs).map(|at_secs| {
                (
                    at_secs,
                    Milestone::LevelCheck {
                        elapsed_minutes: at_secs / 60,
                    },
                )
            }),
        );
        // Stable: growth stays ahead of a level check on the same second.
        crossed.sort_by_key(|(at_secs, _)| *at_secs);
        let milestones = crossed.into_iter().map(|(_, m)| m).collect();

        self.reported_secs = elapsed_secs;
        Tick {
            elapsed_secs,
            milestones,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush_elapsed(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.running_since {
            self.accumulated_ms += millis_between(since, now);
            self.running_since = Some(now.max(since));
        }
    }
}

/// Multiples of `every` in `(after, up_to]`.
fn boundaries(after: u64, up_to: u64, every: u64) -> impl Iterator<Item = u64> {
    let (first, last) = if every == 0 {
        (1, 0)
    } else {
        (after / every + 1, up_to / every)
    };
    (first..=last).map(move |k| k * every)
}

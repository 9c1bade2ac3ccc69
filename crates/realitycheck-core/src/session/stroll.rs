//! Touch-grass stroll: a session with a growing plant.
//!
//! The plant gains a growth point on every growth boundary, is re-levelled
//! on every level check and earns a bonus point each time the phone goes
//! to the background while the stroll is running. Its state rides along
//! in the session's metadata so a later process can pick it up.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::context::TrackingContext;
use super::controller::SessionController;
use super::model::{Session, SessionKind, SessionState};
use crate::error::Result;
use crate::events::Event;
use crate::lifecycle::AppStateListener;
use crate::storage::SessionStore;
use crate::timer::{IntervalTracker, Milestone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlantStage {
    Seed,
    Sprout,
    Sapling,
    Blooming,
}

impl PlantStage {
    pub fn for_level(level: u32) -> Self {
        match level {
            0 | 1 => PlantStage::Seed,
            2 => PlantStage::Sprout,
            3 | 4 => PlantStage::Sapling,
            _ => PlantStage::Blooming,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantGrowth {
    pub level: u32,
    pub growth_points: u32,
    pub bonus_points: u32,
    pub stage: PlantStage,
    /// Elapsed seconds already credited to the plant.
    #[serde(default)]
    pub tracked_secs: u64,
}

impl Default for PlantGrowth {
    fn default() -> Self {
        Self {
            level: 1,
            growth_points: 0,
            bonus_points: 0,
            stage: PlantStage::Seed,
            tracked_secs: 0,
        }
    }
}

impl PlantGrowth {
    /// Plant state stored on a session, or a fresh seed.
    pub fn from_session(session: &Session) -> Self {
        session
            .metadata
            .as_ref()
            .and_then(|m| m.get("plant"))
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default()
    }
}

/// `floor(elapsed_minutes / minutes_per_level) + 1`
pub fn level_for(elapsed_minutes: u64, minutes_per_level: u64) -> u32 {
    let level = elapsed_minutes / minutes_per_level.max(1) + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

pub struct TouchGrassStroll<'a, S: SessionStore + ?Sized> {
    ctx: TrackingContext<'a, S>,
    controller: SessionController<'a, S>,
    tracker: IntervalTracker,
    plant: PlantGrowth,
}

impl<'a, S: SessionStore + ?Sized> TouchGrassStroll<'a, S> {
    pub fn new(ctx: TrackingContext<'a, S>) -> Self {
        Self {
            ctx,
            controller: SessionController::new(ctx, SessionKind::TouchGrass),
            tracker: IntervalTracker::from_config(&ctx.config.tracking),
            plant: PlantGrowth::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> Option<&Session> {
        self.controller.active()
    }

    pub fn last_ended(&self) -> Option<&Session> {
        self.controller.last_ended()
    }

    pub fn plant(&self) -> &PlantGrowth {
        &self.plant
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.tracker.elapsed_secs(self.ctx.now())
    }

    pub fn history(&self) -> Result<Vec<Session>> {
        self.controller.history()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Re-attach to an open stroll, restoring its elapsed time and plant.
    /// Boundaries crossed since the plant was last saved fire on the next
    /// tick.
    pub fn load_active(&mut self) -> Result<bool> {
        let now = self.ctx.now();
        let Some(session) = self.controller.load_active()?.cloned() else {
            return Ok(false);
        };
        self.tracker = IntervalTracker::from_config(&self.ctx.config.tracking);
        self.plant = PlantGrowth::from_session(&session);
        self.tracker.resume_from(session.active_ms_at(now), now);
        self.tracker.set_reported_secs(self.plant.tracked_secs);
        if session.state == SessionState::Paused {
            self.tracker.pause(now);
        }
        Ok(true)
    }

    pub fn start(&mut self) -> Result<Vec<Event>> {
        let Some(event) = self.controller.start_session()? else {
            return Ok(Vec::new());
        };
        let now = self.ctx.now();
        self.tracker = IntervalTracker::from_config(&self.ctx.config.tracking);
        self.tracker.start(now);
        self.plant = PlantGrowth::default();
        Ok(vec![event])
    }

    /// Failed writes still leave the tracker matching the local session.
    pub fn pause(&mut self) -> Result<Vec<Event>> {
        let result = self.controller.pause_session();
        self.sync_tracker();
        Ok(result?.into_iter().collect())
    }

    pub fn resume(&mut self) -> Result<Vec<Event>> {
        let result = self.controller.resume_session();
        self.sync_tracker();
        Ok(result?.into_iter().collect())
    }

    /// Advance the tracker and grow the plant for every boundary crossed.
    pub fn tick(&mut self) -> Vec<Event> {
        let Some(session_id) = self.controller.active().map(|s| s.id.clone()) else {
            return Vec::new();
        };
        let now = self.ctx.now();
        let tick = self.tracker.tick(now);
        self.plant.tracked_secs = tick.elapsed_secs;
        let minutes_per_level = self.ctx.config.tracking.minutes_per_level;

        let mut events = Vec::new();
        for milestone in tick.milestones {
            match milestone {
                Milestone::Growth { at_secs } => {
                    self.plant.growth_points += 1;
                    events.push(Event::GrowthPulse {
                        session_id: session_id.clone(),
                        elapsed_secs: at_secs,
                        growth_points: self.plant.growth_points,
                        at: now,
                    });
                }
                Milestone::LevelCheck { elapsed_minutes } => {
                    let level = level_for(elapsed_minutes, minutes_per_level);
                    events.push(Event::LevelChecked {
                        session_id: session_id.clone(),
                        elapsed_minutes,
                        level,
                        at: now,
                    });
                    if level > self.plant.level {
                        self.plant.level = level;
                        self.plant.stage = PlantStage::for_level(level);
                        events.push(Event::LevelUp {
                            session_id: session_id.clone(),
                            level,
                            stage: self.plant.stage,
                            at: now,
                        });
                    }
                }
            }
        }
        events
    }

    /// Write the current plant onto the open session.
    pub fn save_plant(&mut self) -> Result<()> {
        let metadata = self.metadata()?;
        self.controller.save_metadata(metadata)
    }

    /// Finish the stroll. Boundaries crossed since the last tick still
    /// count; the final plant is stored with the session.
    pub fn end(&mut self) -> Result<Vec<Event>> {
        let mut events = self.tick();
        let metadata = self.metadata()?;
        let result = self.controller.end_session_with_metadata(Some(metadata));
        self.sync_tracker();
        events.extend(result?);
        Ok(events)
    }

    fn sync_tracker(&mut self) {
        let now = self.ctx.now();
        match self.controller.active().map(|s| s.state) {
            Some(SessionState::Active) => {
                self.tracker.resume(now);
            }
            Some(SessionState::Paused) => {
                self.tracker.pause(now);
            }
            Some(SessionState::Ended) | None => {
                self.tracker.stop(now);
            }
        }
    }

    fn metadata(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "plant": serde_json::to_value(&self.plant)? }))
    }
}

impl<S: SessionStore + ?Sized> AppStateListener for TouchGrassStroll<'_, S> {
    fn on_background_transition(&mut self) -> Result<Vec<Event>> {
        let Some(session) = self.controller.active() else {
            return Ok(Vec::new());
        };
        if session.state != SessionState::Active {
            debug!(session_id = %session.id, "stroll paused, no bonus");
            return Ok(Vec::new());
        }
        let session_id = session.id.clone();
        self.plant.bonus_points += 1;
        let event = Event::BonusPulse {
            session_id,
            bonus_points: self.plant.bonus_points,
            at: self.ctx.now(),
        };
        if let Err(e) = self.save_plant() {
            warn!(error = %e, "failed to persist bonus pulse");
            return Err(e);
        }
        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{Config, MemoryStore};
    use crate::user::StaticUser;
    use chrono::{DateTime, Utc};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-14T17:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn count(events: &[Event], pred: impl Fn(&Event) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn stroll_of_125_seconds() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let mut stroll = TouchGrassStroll::new(TrackingContext::new(&store, &user, &clock, &config));

        stroll.start().unwrap();
        let mut events = Vec::new();
        for _ in 0..125 {
            clock.advance_secs(1);
            events.extend(stroll.tick());
        }
        events.extend(stroll.end().unwrap());

        assert_eq!(count(&events, |e| matches!(e, Event::GrowthPulse { .. })), 4);
        assert_eq!(count(&events, |e| matches!(e, Event::LevelChecked { level: 1, .. })), 2);
        assert_eq!(count(&events, |e| matches!(e, Event::LevelUp { .. })), 0);
        assert!(matches!(
            events.last(),
            Some(Event::SessionEnded { duration_minutes: 2, rewards_earned: Some(3), .. })
        ));

        let ended = stroll.last_ended().unwrap();
        assert_eq!(ended.metadata.as_ref().unwrap()["plant"]["growth_points"], 4);
    }

    #[test]
    fn level_up_after_ten_minutes() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let mut stroll = TouchGrassStroll::new(TrackingContext::new(&store, &user, &clock, &config));

        stroll.start().unwrap();
        clock.advance_secs(10 * 60);
        let events = stroll.tick();
        assert_eq!(count(&events, |e| matches!(e, Event::LevelUp { level: 2, stage: PlantStage::Sprout, .. })), 1);
        assert_eq!(stroll.plant().growth_points, 20);
    }

    #[test]
    fn background_while_active_gives_bonus_and_persists_plant() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let ctx = TrackingContext::new(&store, &user, &clock, &config);
        let mut stroll = TouchGrassStroll::new(ctx);

        assert!(stroll.on_background_transition().unwrap().is_empty());
        stroll.start().unwrap();
        let events = stroll.on_background_transition().unwrap();
        assert!(matches!(events[..], [Event::BonusPulse { bonus_points: 1, .. }]));

        stroll.pause().unwrap();
        assert!(stroll.on_background_transition().unwrap().is_empty());

        let mut reloaded = TouchGrassStroll::new(ctx);
        assert!(reloaded.load_active().unwrap());
        assert_eq!(reloaded.plant().bonus_points, 1);
    }

    #[test]
    fn reloaded_stroll_keeps_elapsed_time() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let ctx = TrackingContext::new(&store, &user, &clock, &config);

        let mut first = TouchGrassStroll::new(ctx);
        first.start().unwrap();
        clock.advance_secs(45);
        first.tick();
        first.save_plant().unwrap();

        let mut second = TouchGrassStroll::new(ctx);
        assert!(second.load_active().unwrap());
        assert_eq!(second.elapsed_secs(), 45);
        assert_eq!(second.plant().growth_points, 1);
        clock.advance_secs(15);
        let events = second.tick();
        assert_eq!(count(&events, |e| matches!(e, Event::GrowthPulse { elapsed_secs: 60, .. })), 1);
    }

    #[test]
    fn missed_milestones_replay_after_reload() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let ctx = TrackingContext::new(&store, &user, &clock, &config);

        let mut first = TouchGrassStroll::new(ctx);
        first.start().unwrap();
        first.save_plant().unwrap();
        clock.advance_secs(70);

        let mut second = TouchGrassStroll::new(ctx);
        second.load_active().unwrap();
        let events = second.tick();
        assert_eq!(count(&events, |e| matches!(e, Event::GrowthPulse { .. })), 2);
        assert_eq!(count(&events, |e| matches!(e, Event::LevelChecked { .. })), 1);
        assert_eq!(second.plant().tracked_secs, 70);
    }

    #[test]
    fn failed_pause_still_freezes_growth() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let mut stroll = TouchGrassStroll::new(TrackingContext::new(&store, &user, &clock, &config));

        stroll.start().unwrap();
        clock.advance_secs(10);
        store.set_failing(true);
        assert!(stroll.pause().is_err());
        assert_eq!(stroll.session().unwrap().state, SessionState::Paused);

        clock.advance_secs(600);
        let events = stroll.tick();
        assert_eq!(count(&events, |e| matches!(e, Event::GrowthPulse { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, Event::LevelUp { .. })), 0);
        assert_eq!(stroll.elapsed_secs(), 10);
    }

    #[test]
    fn failed_resume_still_restarts_growth() {
        let store = MemoryStore::new();
        let user = StaticUser::signed_in("u1");
        let clock = ManualClock::new(t0());
        let config = Config::default();
        let mut stroll = TouchGrassStroll::new(TrackingContext::new(&store, &user, &clock, &config));

        stroll.start().unwrap();
        stroll.pause().unwrap();
        store.set_failing(true);
        assert!(stroll.resume().is_err());
        assert_eq!(stroll.session().unwrap().state, SessionState::Active);

        clock.advance_secs(30);
        let events = stroll.tick();
        assert_eq!(count(&events, |e| matches!(e, Event::GrowthPulse { elapsed_secs: 30, .. })), 1);
    }

    #[test]
    fn stages_follow_levels() {
        assert_eq!(PlantStage::for_level(1), PlantStage::Seed);
        assert_eq!(PlantStage::for_level(2), PlantStage::Sprout);
        assert_eq!(PlantStage::for_level(4), PlantStage::Sapling);
        assert_eq!(PlantStage::for_level(9), PlantStage::Blooming);
        assert_eq!(level_for(25, 10), 3);
        assert_eq!(level_for(5, 0), 6);
    }
}

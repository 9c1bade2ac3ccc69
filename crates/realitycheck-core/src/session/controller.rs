//! Session lifecycle controller.
//!
//! Drives one session kind through `start -> (pause <-> resume) -> end`
//! against a [`SessionStore`]. At most one open session per user and kind
//! is held; the store enforces the same rule so two devices cannot race
//! past it.
//!
//! Every command is a no-op returning `Ok(None)` when nobody is signed
//! in. Local state is updated before the write and is not rolled back if
//! the write fails.

use serde_json::Value;
use tracing::{debug, info, warn};

use super::context::TrackingContext;
use super::model::{Session, SessionKind, SessionState};
use crate::blocking::BlockList;
use crate::error::{CoreError, Result, StoreError};
use crate::events::Event;
use crate::stats::{StatsService, UserStats};
use crate::storage::SessionStore;

pub struct SessionController<'a, S: SessionStore + ?Sized> {
    ctx: TrackingContext<'a, S>,
    kind: SessionKind,
    active: Option<Session>,
    last_ended: Option<Session>,
    stats: Option<UserStats>,
}

impl<'a, S: SessionStore + ?Sized> SessionController<'a, S> {
    pub fn new(ctx: TrackingContext<'a, S>, kind: SessionKind) -> Self {
        Self {
            ctx,
            kind,
            active: None,
            last_ended: None,
            stats: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    /// The session most recently ended through this controller.
    pub fn last_ended(&self) -> Option<&Session> {
        self.last_ended.as_ref()
    }

    /// Stats as of the last offline session this controller ended.
    pub fn cached_stats(&self) -> Option<&UserStats> {
        self.stats.as_ref()
    }

    /// Active seconds of the open session, if any.
    pub fn elapsed_secs(&self) -> Option<u64> {
        self.active
            .as_ref()
            .map(|session| session.elapsed_secs(self.ctx.now()))
    }

    /// Completed sessions of this kind for the signed-in user, oldest first.
    pub fn history(&self) -> Result<Vec<Session>> {
        let Some(user_id) = self.ctx.user_id() else {
            return Ok(Vec::new());
        };
        Ok(self.ctx.store.completed_sessions(&user_id, self.kind)?)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Re-attach to an open session left by an earlier process.
    pub fn load_active(&mut self) -> Result<Option<&Session>> {
        let Some(user_id) = self.ctx.user_id() else {
            debug!(kind = %self.kind, "no signed-in user, nothing to load");
            return Ok(None);
        };
        self.active = self.ctx.store.active_session(&user_id, self.kind)?;
        Ok(self.active.as_ref())
    }

    pub fn start_session(&mut self) -> Result<Option<Event>> {
        let Some(user_id) = self.ctx.user_id() else {
            debug!(kind = %self.kind, "no signed-in user, ignoring start");
            return Ok(None);
        };

        if let Some(open) = self.active.as_ref().filter(|s| s.is_open()) {
            return Err(self.already_active(&open.id));
        }
        if let Some(open) = self.ctx.store.active_session(&user_id, self.kind)? {
            let err = self.already_active(&open.id);
            self.active = Some(open);
            return Err(err);
        }

        let now = self.ctx.now();
        let mut session = Session::new(user_id.as_str(), self.kind, now);
        if self.kind == SessionKind::Offline {
            session.blocked_apps =
                BlockList::from_config(&self.ctx.config.block_list).apply(&session.id);
        }
        self.active = Some(session.clone());

        match self.ctx.store.insert_session(&session) {
            Ok(()) => {}
            Err(StoreError::ActiveSessionExists { .. }) => {
                // Lost a race with another writer: adopt whatever is open.
                self.active = self.ctx.store.active_session(&user_id, self.kind)?;
                let id = self.active.as_ref().map(|s| s.id.clone()).unwrap_or_default();
                return Err(self.already_active(&id));
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "failed to persist session start");
                return Err(e.into());
            }
        }

        info!(session_id = %session.id, kind = %self.kind, "session started");
        Ok(Some(Event::SessionStarted {
            session_id: session.id,
            kind: self.kind,
            blocked_apps: session.blocked_apps,
            at: now,
        }))
    }

    pub fn pause_session(&mut self) -> Result<Option<Event>> {
        if self.ctx.user_id().is_none() {
            return Ok(None);
        }
        let now = self.ctx.now();
        let session = self.open_session_mut()?;
        session.pause(now)?;
        let event = Event::SessionPaused {
            session_id: session.id.clone(),
            kind: session.kind,
            active_secs: session.elapsed_secs(now),
            at: now,
        };
        self.persist_active()?;
        Ok(Some(event))
    }

    pub fn resume_session(&mut self) -> Result<Option<Event>> {
        if self.ctx.user_id().is_none() {
            return Ok(None);
        }
        let now = self.ctx.now();
        let session = self.open_session_mut()?;
        session.resume(now)?;
        let event = Event::SessionResumed {
            session_id: session.id.clone(),
            kind: session.kind,
            active_secs: session.elapsed_secs(now),
            at: now,
        };
        self.persist_active()?;
        Ok(Some(event))
    }

    pub fn end_session(&mut self) -> Result<Option<Event>> {
        self.end_session_with_metadata(None)
    }

    /// End the open session, attaching `metadata` when given. Offline
    /// sessions refresh the user's stats afterwards.
    pub fn end_session_with_metadata(&mut self, metadata: Option<Value>) -> Result<Option<Event>> {
        if self.ctx.user_id().is_none() {
            return Ok(None);
        }
        let now = self.ctx.now();
        let mut session = self
            .active
            .take()
            .ok_or(CoreError::NoActiveSession { kind: self.kind })?;

        if let Err(e) = session.finish(now, self.ctx.config.tracking.reward_multiplier) {
            self.active = Some(session);
            return Err(e);
        }
        if metadata.is_some() {
            session.metadata = metadata;
        }
        self.last_ended = Some(session.clone());

        if let Err(e) = self.ctx.store.update_session(&session) {
            warn!(session_id = %session.id, error = %e, "failed to persist session end");
            return Err(e.into());
        }
        info!(
            session_id = %session.id,
            kind = %self.kind,
            duration_minutes = session.duration_minutes.unwrap_or(0),
            "session ended"
        );

        if self.kind == SessionKind::Offline {
            let stats = StatsService::new(self.ctx.store).refresh_after(&session, self.stats.as_ref());
            self.stats = Some(stats);
        }

        Ok(Some(Event::SessionEnded {
            session_id: session.id,
            kind: self.kind,
            duration_minutes: session.duration_minutes.unwrap_or(0),
            rewards_earned: session.rewards_earned,
            at: now,
        }))
    }

    /// Replace the metadata of the open session and persist it.
    pub fn save_metadata(&mut self, metadata: Value) -> Result<()> {
        let session = self.open_session_mut()?;
        session.metadata = Some(metadata);
        self.persist_active()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn open_session_mut(&mut self) -> Result<&mut Session> {
        let kind = self.kind;
        self.active
            .as_mut()
            .filter(|s| s.state != SessionState::Ended)
            .ok_or(CoreError::NoActiveSession { kind })
    }

    fn persist_active(&self) -> Result<()> {
        let Some(session) = self.active.as_ref() else {
            return Ok(());
        };
        self.ctx.store.update_session(session).map_err(|e| {
            warn!(session_id = %session.id, error = %e, "failed to persist session update");
            e.into()
        })
    }

    fn already_active(&self, id: &str) -> CoreError {
        CoreError::SessionAlreadyActive {
            kind: self.kind,
            id: id.to_string(),
        }
    }
}

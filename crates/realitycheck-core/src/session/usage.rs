//! In-app screen usage measurement.
//!
//! One window is open at a time. Closing a window writes an
//! [`AppUsageLog`] unless it lasted less than the configured minimum, in
//! which case it is dropped. Going to the background closes the window
//! and remembers the screen so coming back reopens it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::context::TrackingContext;
use super::model::AppUsageLog;
use crate::clock::millis_between;
use crate::error::Result;
use crate::events::Event;
use crate::lifecycle::AppStateListener;
use crate::storage::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub screen_name: String,
    pub started_at: DateTime<Utc>,
}

/// Serializable tracker state, so a window can span processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageWindow {
    #[serde(default)]
    pub open: Option<OpenWindow>,
    /// Screen to reopen on the next foreground transition.
    #[serde(default)]
    pub suspended_screen: Option<String>,
}

pub struct UsageTracker<'a, S: SessionStore + ?Sized> {
    ctx: TrackingContext<'a, S>,
    window: UsageWindow,
}

impl<'a, S: SessionStore + ?Sized> UsageTracker<'a, S> {
    pub fn new(ctx: TrackingContext<'a, S>) -> Self {
        Self::with_window(ctx, UsageWindow::default())
    }

    pub fn with_window(ctx: TrackingContext<'a, S>, window: UsageWindow) -> Self {
        Self { ctx, window }
    }

    pub fn window(&self) -> &UsageWindow {
        &self.window
    }

    /// Open a window for `screen_name`, closing any previous one first.
    pub fn start_tracking(&mut self, screen_name: &str) -> Result<Vec<Event>> {
        let Some(user_id) = self.ctx.user_id() else {
            debug!(screen_name, "no signed-in user, not tracking usage");
            return Ok(Vec::new());
        };
        let now = self.ctx.now();
        let mut events: Vec<Event> = self.close_window(&user_id, now)?.into_iter().collect();
        self.window.suspended_screen = None;
        events.push(self.open_window(screen_name.to_string(), now));
        Ok(events)
    }

    pub fn stop_tracking(&mut self) -> Result<Vec<Event>> {
        self.window.suspended_screen = None;
        let Some(user_id) = self.ctx.user_id() else {
            self.window.open = None;
            return Ok(Vec::new());
        };
        Ok(self.close_window(&user_id, self.ctx.now())?.into_iter().collect())
    }

    /// Logged windows for the signed-in user, newest first.
    pub fn logs(&self) -> Result<Vec<AppUsageLog>> {
        let Some(user_id) = self.ctx.user_id() else {
            return Ok(Vec::new());
        };
        Ok(self.ctx.store.usage_logs(&user_id)?)
    }

    fn open_window(&mut self, screen_name: String, now: DateTime<Utc>) -> Event {
        debug!(%screen_name, "usage window opened");
        self.window.open = Some(OpenWindow {
            screen_name: screen_name.clone(),
            started_at: now,
        });
        Event::UsageStarted {
            screen_name,
            at: now,
        }
    }

    fn close_window(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<Option<Event>> {
        let Some(open) = self.window.open.take() else {
            return Ok(None);
        };
        let elapsed_ms = millis_between(open.started_at, now);
        let minutes = elapsed_ms / 60_000;
        let threshold = self.ctx.config.tracking.min_usage_minutes.max(1);

        if minutes < threshold {
            debug!(screen_name = %open.screen_name, elapsed_ms, "usage window too short, discarded");
            return Ok(Some(Event::UsageDiscarded {
                screen_name: open.screen_name,
                elapsed_secs: elapsed_ms / 1000,
                at: now,
            }));
        }

        let log = AppUsageLog {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            screen_name: open.screen_name,
            started_at: open.started_at,
            ended_at: now,
            duration_minutes: minutes,
        };
        self.ctx.store.insert_usage_log(&log)?;
        info!(screen_name = %log.screen_name, minutes, "usage logged");
        Ok(Some(Event::UsageLogged {
            screen_name: log.screen_name,
            duration_minutes: minutes,
            at: now,
        }))
    }
}

impl<S: SessionStore + ?Sized> AppStateListener for UsageTracker<'_, S> {
    fn on_background_transition(&mut self) -> Result<Vec<Event>> {
        let Some(screen) = self.window.open.as_ref().map(|w| w.screen_name.clone()) else {
            return Ok(Vec::new());
        };
        let events = self.stop_tracking()?;
        self.window.suspended_screen = Some(screen);
        Ok(events)
    }

    fn on_foreground_transition(&mut self) -> Result<Vec<Event>> {
        match self.window.suspended_screen.take() {
            Some(screen) => self.start_tracking(&screen),
            None => Ok(Vec::new()),
        }
    }
}

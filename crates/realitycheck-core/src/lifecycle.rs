//! Host foreground/background observer.
//!
//! The host reports `active`, `background` or `inactive`. Leaving `active`
//! is a background transition; returning to `active` is a foreground
//! transition. Moves between `background` and `inactive` are ignored.
//! Listeners subscribe through [`AppStateListener`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    #[default]
    Active,
    Background,
    Inactive,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Active => "active",
            AppState::Background => "background",
            AppState::Inactive => "inactive",
        }
    }

    pub fn is_foreground(&self) -> bool {
        *self == AppState::Active
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AppState::Active),
            "background" => Ok(AppState::Background),
            "inactive" => Ok(AppState::Inactive),
            other => Err(ValidationError::InvalidValue {
                field: "app_state".into(),
                message: format!("unknown app state '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    ToBackground,
    ToForeground,
}

/// Something that reacts to the app moving between foreground and
/// background.
pub trait AppStateListener {
    fn on_background_transition(&mut self) -> Result<Vec<Event>> {
        Ok(Vec::new()) // default no-op
    }

    fn on_foreground_transition(&mut self) -> Result<Vec<Event>> {
        Ok(Vec::new()) // default no-op
    }
}

/// What a single `dispatch` produced.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub transition: Option<Transition>,
    pub events: Vec<Event>,
    /// Listener failures; the remaining listeners still ran.
    pub errors: Vec<CoreError>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AppStateObserver {
    current: AppState,
}

impl AppStateObserver {
    pub fn new(initial: AppState) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> AppState {
        self.current
    }

    /// Record the new host state and classify the change.
    pub fn observe(&mut self, next: AppState) -> Option<Transition> {
        let previous = std::mem::replace(&mut self.current, next);
        match (previous.is_foreground(), next.is_foreground()) {
            (true, false) => Some(Transition::ToBackground),
            (false, true) => Some(Transition::ToForeground),
            _ => None,
        }
    }

    /// Record the new state and notify every listener of the transition.
    pub fn dispatch(
        &mut self,
        next: AppState,
        listeners: &mut [&mut dyn AppStateListener],
        at: DateTime<Utc>,
    ) -> Dispatch {
        let from = self.current;
        let transition = self.observe(next);
        let mut outcome = Dispatch {
            transition,
            ..Dispatch::default()
        };
        if from != next {
            outcome.events.push(Event::AppStateChanged { from, to: next, at });
        }

        let Some(transition) = transition else {
            debug!(%from, to = %next, "app state change without transition");
            return outcome;
        };

        for listener in listeners.iter_mut() {
            let result = match transition {
                Transition::ToBackground => listener.on_background_transition(),
                Transition::ToForeground => listener.on_foreground_transition(),
            };
            match result {
                Ok(events) => outcome.events.extend(events),
                Err(e) => {
                    warn!(error = %e, ?transition, "app state listener failed");
                    outcome.errors.push(e);
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        background: u32,
        foreground: u32,
        fail: bool,
    }

    impl AppStateListener for Recorder {
        fn on_background_transition(&mut self) -> Result<Vec<Event>> {
            self.background += 1;
            if self.fail {
                return Err(CoreError::Validation(ValidationError::InvalidValue {
                    field: "test".into(),
                    message: "boom".into(),
                }));
            }
            Ok(Vec::new())
        }

        fn on_foreground_transition(&mut self) -> Result<Vec<Event>> {
            self.foreground += 1;
            Ok(Vec::new())
        }
    }

    #[test]
    fn classifies_transitions() {
        let mut observer = AppStateObserver::new(AppState::Active);
        assert_eq!(observer.observe(AppState::Inactive), Some(Transition::ToBackground));
        assert_eq!(observer.observe(AppState::Background), None);
        assert_eq!(observer.observe(AppState::Active), Some(Transition::ToForeground));
        assert_eq!(observer.observe(AppState::Active), None);
    }

    #[test]
    fn dispatch_notifies_all_listeners_even_after_failure() {
        let mut observer = AppStateObserver::default();
        let mut failing = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut ok = Recorder::default();

        let outcome = observer.dispatch(
            AppState::Background,
            &mut [&mut failing, &mut ok],
            Utc::now(),
        );
        assert_eq!(outcome.transition, Some(Transition::ToBackground));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!((failing.background, ok.background), (1, 1));

        let outcome = observer.dispatch(AppState::Active, &mut [&mut failing, &mut ok], Utc::now());
        assert!(outcome.errors.is_empty());
        assert_eq!((failing.foreground, ok.foreground), (1, 1));
    }

    #[test]
    fn parses_host_strings() {
        assert_eq!("background".parse::<AppState>().unwrap(), AppState::Background);
        assert!("asleep".parse::<AppState>().is_err());
    }
}

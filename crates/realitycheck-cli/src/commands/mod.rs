pub mod app_state;
pub mod config;
pub mod session;
pub mod stats;
pub mod usage;

use chrono::Utc;
use realitycheck_core::{Backend, Config, SystemClock, TrackingContext, UserProvider};
use serde::Serialize;
use tracing::warn;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs for one invocation.
pub struct Runtime {
    pub config: Config,
    pub backend: Backend,
    clock: SystemClock,
}

impl Runtime {
    /// Load config, apply the `--user` override and connect the backend.
    pub fn load(user: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Config::load()?;
        if let Some(user) = user {
            config.user.current_user_id = Some(user);
        }
        let backend = Backend::connect(&config, Utc::now());
        if backend.is_mock() {
            warn!("running against mock data; nothing will be saved");
        }
        Ok(Self {
            config,
            backend,
            clock: SystemClock,
        })
    }

    pub fn ctx(&self) -> TrackingContext<'_, Backend> {
        TrackingContext::new(&self.backend, &self.config, &self.clock, &self.config)
    }

    pub fn user_id(&self) -> Option<String> {
        self.config.current_user_id()
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

use clap::Subcommand;
use realitycheck_core::{Backend, SessionStore, UsageTracker, UsageWindow};

use super::{print_json, CliResult, Runtime};

const WINDOW_KEY: &str = "usage_window";

#[derive(Subcommand)]
pub enum UsageAction {
    /// Start measuring time on a screen
    Start {
        /// Screen name
        screen: String,
    },
    /// Stop measuring and log the window if it was long enough
    Stop,
    /// Logged usage windows, newest first
    List,
}

fn window_key(user_id: &str) -> String {
    format!("{WINDOW_KEY}:{user_id}")
}

pub(crate) fn load_window(store: &Backend, user_id: Option<&str>) -> UsageWindow {
    let Some(user_id) = user_id else {
        return UsageWindow::default();
    };
    if let Ok(Some(json)) = store.kv_get(&window_key(user_id)) {
        if let Ok(window) = serde_json::from_str::<UsageWindow>(&json) {
            return window;
        }
    }
    UsageWindow::default()
}

pub(crate) fn save_window(store: &Backend, user_id: Option<&str>, window: &UsageWindow) -> CliResult {
    let Some(user_id) = user_id else {
        return Ok(());
    };
    let json = serde_json::to_string(window)?;
    store.kv_set(&window_key(user_id), &json)?;
    Ok(())
}

pub fn run(action: UsageAction, user: Option<String>) -> CliResult {
    let runtime = Runtime::load(user)?;
    let user_id = runtime.user_id();
    let window = load_window(&runtime.backend, user_id.as_deref());
    let mut tracker = UsageTracker::with_window(runtime.ctx(), window);

    match action {
        UsageAction::Start { screen } => print_json(&tracker.start_tracking(&screen)?)?,
        UsageAction::Stop => print_json(&tracker.stop_tracking()?)?,
        UsageAction::List => print_json(&tracker.logs()?)?,
    }

    save_window(&runtime.backend, user_id.as_deref(), tracker.window())
}

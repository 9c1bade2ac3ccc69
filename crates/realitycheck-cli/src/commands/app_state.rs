use chrono::Utc;
use realitycheck_core::{
    AppState, AppStateObserver, SessionStore, TouchGrassStroll, UsageTracker,
};
use serde_json::json;

use super::usage::{load_window, save_window};
use super::{print_json, CliResult, Runtime};

const OBSERVER_KEY: &str = "app_state";

/// Report a host app-state change and fan it out to the open stroll and
/// the usage window.
pub fn run(state: AppState, user: Option<String>) -> CliResult {
    let runtime = Runtime::load(user)?;
    let user_id = runtime.user_id();
    let ctx = runtime.ctx();

    let mut observer = runtime
        .backend
        .kv_get(OBSERVER_KEY)
        .ok()
        .flatten()
        .and_then(|json| serde_json::from_str::<AppStateObserver>(&json).ok())
        .unwrap_or_default();

    let mut usage = UsageTracker::with_window(ctx, load_window(&runtime.backend, user_id.as_deref()));
    let mut stroll = TouchGrassStroll::new(ctx);
    stroll.load_active()?;
    let mut events = stroll.tick();

    let outcome = observer.dispatch(state, &mut [&mut stroll, &mut usage], Utc::now());
    events.extend(outcome.events);
    for e in &outcome.errors {
        eprintln!("warning: {}", e.user_message());
    }

    runtime
        .backend
        .kv_set(OBSERVER_KEY, &serde_json::to_string(&observer)?)?;
    save_window(&runtime.backend, user_id.as_deref(), usage.window())?;
    if stroll.session().is_some() {
        stroll.save_plant()?;
    }

    print_json(&json!({
        "state": observer.current(),
        "transition": outcome.transition,
        "events": events,
    }))
}

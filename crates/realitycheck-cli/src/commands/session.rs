use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Subcommand;
use realitycheck_core::{
    Event, PlantGrowth, Session, SessionController, SessionKind, Ticker, TouchGrassStroll,
};
use serde::Serialize;

use super::{print_json, CliResult, Runtime};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session
    Start,
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// End the open session
    End,
    /// Print the open session as JSON
    Status,
    /// Follow the open session, printing one JSON line per tick
    Watch {
        /// How long to watch
        #[arg(long, default_value = "10")]
        seconds: u64,
    },
    /// Completed sessions, oldest first
    History,
}

#[derive(Serialize)]
struct Status<'a> {
    kind: SessionKind,
    session: Option<&'a Session>,
    elapsed_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plant: Option<&'a PlantGrowth>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<Event>,
}

pub fn run(action: SessionAction, kind: SessionKind, user: Option<String>) -> CliResult {
    let runtime = Runtime::load(user)?;
    if runtime.user_id().is_none() {
        eprintln!("not signed in: pass --user or set user.current_user_id");
    }
    match kind {
        SessionKind::Offline => run_offline(&runtime, action),
        SessionKind::TouchGrass => run_stroll(&runtime, action),
    }
}

fn run_offline(runtime: &Runtime, action: SessionAction) -> CliResult {
    let mut ctl = SessionController::new(runtime.ctx(), SessionKind::Offline);
    ctl.load_active()?;

    match action {
        SessionAction::Start => print_events(ctl.start_session()?.into_iter().collect()),
        SessionAction::Pause => print_events(ctl.pause_session()?.into_iter().collect()),
        SessionAction::Resume => print_events(ctl.resume_session()?.into_iter().collect()),
        SessionAction::End => {
            let mut events: Vec<Event> = ctl.end_session()?.into_iter().collect();
            if let Some(stats) = ctl.cached_stats() {
                events.push(Event::stats_updated(stats, Utc::now()));
            }
            print_events(events)
        }
        SessionAction::Status => print_json(&Status {
            kind: SessionKind::Offline,
            session: ctl.active(),
            elapsed_secs: ctl.elapsed_secs(),
            plant: None,
            events: Vec::new(),
        }),
        SessionAction::Watch { seconds } => {
            watch(seconds, runtime.config.tracking.tick_interval_ms, || {
                let line = serde_json::json!({
                    "kind": SessionKind::Offline,
                    "elapsed_secs": ctl.elapsed_secs(),
                });
                println!("{line}");
                Ok(())
            })
        }
        SessionAction::History => print_json(&ctl.history()?),
    }
}

fn run_stroll(runtime: &Runtime, action: SessionAction) -> CliResult {
    let mut stroll = TouchGrassStroll::new(runtime.ctx());
    stroll.load_active()?;
    // Catch up on boundaries crossed since the last invocation.
    let mut events = stroll.tick();

    let print = match action {
        SessionAction::Start => {
            events.extend(stroll.start()?);
            true
        }
        SessionAction::Pause => {
            events.extend(stroll.pause()?);
            true
        }
        SessionAction::Resume => {
            events.extend(stroll.resume()?);
            true
        }
        SessionAction::End => {
            events.extend(stroll.end()?);
            true
        }
        SessionAction::Status => {
            let session = stroll.session();
            print_json(&Status {
                kind: SessionKind::TouchGrass,
                session,
                elapsed_secs: session.map(|_| stroll.elapsed_secs()),
                plant: session.map(|_| stroll.plant()),
                events: std::mem::take(&mut events),
            })?;
            false
        }
        SessionAction::Watch { seconds } => {
            for event in events.drain(..) {
                println!("{}", serde_json::to_string(&event)?);
            }
            watch(seconds, runtime.config.tracking.tick_interval_ms, || {
                for event in stroll.tick() {
                    println!("{}", serde_json::to_string(&event)?);
                }
                Ok(())
            })?;
            false
        }
        SessionAction::History => return print_json(&stroll.history()?),
    };

    if stroll.session().is_some() {
        stroll.save_plant()?;
    }
    if print {
        print_events(events)?;
    }
    Ok(())
}

fn print_events(events: Vec<Event>) -> CliResult {
    print_json(&events)
}

/// Drive `on_tick` from a [`Ticker`] until `seconds` have passed.
fn watch(
    seconds: u64,
    tick_interval_ms: u64,
    mut on_tick: impl FnMut() -> CliResult,
) -> CliResult {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    rt.block_on(async {
        let deadline = Instant::now() + Duration::from_secs(seconds);
        let mut ticker = Ticker::spawn(Duration::from_millis(tick_interval_ms.max(1)));
        while Instant::now() < deadline {
            if ticker.next().await.is_none() {
                break;
            }
            on_tick()?;
        }
        ticker.stop();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

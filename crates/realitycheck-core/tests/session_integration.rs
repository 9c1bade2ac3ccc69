//! Integration tests for session tracking against a real SQLite file.
//!
//! Covers the path a CLI invocation takes: open the database, drive a
//! session, drop everything, reopen and check what was persisted.

use chrono::{DateTime, Duration, Utc};
use realitycheck_core::{
    AppState, AppStateListener, AppStateObserver, Config, CoreError, Database, Event,
    Clock, ManualClock, SessionController, SessionKind, SessionState, SessionStore, StaticUser,
    TouchGrassStroll, TrackingContext, UsageTracker,
};

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-07-06T06:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn offline_sessions_on_consecutive_days_build_a_streak() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("realitycheck.db");
    let user = StaticUser::signed_in("u1");
    let clock = ManualClock::new(t0());
    let config = Config::default();

    for day in 0..3 {
        let db = Database::open_at(&path).unwrap();
        let ctx = TrackingContext::new(&db, &user, &clock, &config);
        clock.set(t0() + Duration::days(day));

        let mut ctl = SessionController::new(ctx, SessionKind::Offline);
        ctl.start_session().unwrap();
        clock.advance(Duration::minutes(20));
        ctl.end_session().unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let stats = db.user_stats("u1").unwrap().unwrap();
    assert_eq!(stats.offline_session_count, 3);
    assert_eq!(stats.total_offline_minutes, 60);
    assert_eq!(stats.current_streak, 3);
    assert_eq!(stats.longest_streak, 3);
    assert_eq!(
        stats.last_session_date,
        Some((t0() + Duration::days(2)).date_naive())
    );
}

#[test]
fn open_session_survives_reopen_and_blocks_second_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("realitycheck.db");
    let user = StaticUser::signed_in("u1");
    let clock = ManualClock::new(t0());
    let config = Config::default();

    {
        let db = Database::open_at(&path).unwrap();
        let mut ctl = SessionController::new(
            TrackingContext::new(&db, &user, &clock, &config),
            SessionKind::Offline,
        );
        ctl.start_session().unwrap();
        clock.advance(Duration::minutes(7));
        ctl.pause_session().unwrap();
    }

    clock.advance(Duration::hours(2));
    let db = Database::open_at(&path).unwrap();
    let ctx = TrackingContext::new(&db, &user, &clock, &config);

    let mut fresh = SessionController::new(ctx, SessionKind::Offline);
    assert!(matches!(
        fresh.start_session(),
        Err(CoreError::SessionAlreadyActive { .. })
    ));

    let session = fresh.active().cloned().unwrap();
    assert_eq!(session.state, SessionState::Paused);
    assert_eq!(session.blocked_apps.len(), 5);

    fresh.resume_session().unwrap();
    clock.advance(Duration::minutes(3));
    fresh.end_session().unwrap();

    let stored = db.get_session(&session.id).unwrap().unwrap();
    assert_eq!(stored.duration_minutes, Some(10));
    assert!(stored.is_completed());
}

#[test]
fn stroll_and_usage_react_to_app_state() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("realitycheck.db")).unwrap();
    let user = StaticUser::signed_in("u1");
    let clock = ManualClock::new(t0());
    let config = Config::default();
    let ctx = TrackingContext::new(&db, &user, &clock, &config);

    let mut stroll = TouchGrassStroll::new(ctx);
    let mut usage = UsageTracker::new(ctx);
    let mut observer = AppStateObserver::new(AppState::Active);

    usage.start_tracking("Garden").unwrap();
    stroll.start().unwrap();
    clock.advance(Duration::seconds(90));
    stroll.tick();

    let listeners: &mut [&mut dyn AppStateListener] = &mut [&mut stroll, &mut usage];
    let outcome = observer.dispatch(AppState::Background, listeners, clock.now());
    assert!(outcome.errors.is_empty());
    assert!(outcome.events.iter().any(|e| matches!(e, Event::BonusPulse { .. })));
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, Event::UsageLogged { duration_minutes: 1, .. })));

    // Inactive after background is not a transition.
    let outcome = observer.dispatch(AppState::Inactive, &mut [&mut stroll, &mut usage], clock.now());
    assert!(outcome.transition.is_none());

    clock.advance(Duration::seconds(40));
    let outcome = observer.dispatch(AppState::Active, &mut [&mut stroll, &mut usage], clock.now());
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, Event::UsageStarted { screen_name, .. } if screen_name == "Garden")));

    let events = stroll.end().unwrap();
    assert!(matches!(
        events.last(),
        Some(Event::SessionEnded { duration_minutes: 2, rewards_earned: Some(3), .. })
    ));
    let ended = stroll.last_ended().unwrap();
    assert_eq!(ended.metadata.as_ref().unwrap()["plant"]["bonus_points"], 1);
    assert!(db.user_stats("u1").unwrap().is_none());
}

#[test]
fn signed_out_user_writes_nothing() {
    let db = Database::open_memory().unwrap();
    let user = StaticUser::signed_out();
    let clock = ManualClock::new(t0());
    let config = Config::default();
    let ctx = TrackingContext::new(&db, &user, &clock, &config);

    let mut ctl = SessionController::new(ctx, SessionKind::TouchGrass);
    assert!(ctl.start_session().unwrap().is_none());
    assert!(db.active_session("", SessionKind::TouchGrass).unwrap().is_none());
}

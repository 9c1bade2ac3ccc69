//! # RealityCheck Core Library
//!
//! Session and time tracking for the RealityCheck digital-wellness app.
//! Everything the CLI does goes through this crate; a front end is a thin
//! layer over the same types.
//!
//! ## Architecture
//!
//! - **Timer**: A wall-clock interval tracker. The caller feeds it instants
//!   (usually from a [`Ticker`]) and it reports growth and level milestones
//! - **Sessions**: Offline and touch-grass lifecycles, plus in-app usage
//!   windows
//! - **Lifecycle**: Foreground/background observer that fans transitions
//!   out to listeners
//! - **Stats**: Totals and daily streaks over completed offline sessions
//! - **Storage**: SQLite persistence with an in-memory mock fallback, and
//!   TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionController`]: Session state machine bound to a store
//! - [`TouchGrassStroll`]: Touch-grass session with plant growth
//! - [`UsageTracker`]: Screen usage windows
//! - [`Backend`]: Store selection with mock fallback
//! - [`Config`]: Application configuration management

pub mod blocking;
pub mod clock;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;
pub mod user;

pub use blocking::BlockList;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, Result, StoreError, ValidationError};
pub use events::Event;
pub use lifecycle::{AppState, AppStateListener, AppStateObserver, Dispatch, Transition};
pub use session::{
    AppUsageLog, PlantGrowth, PlantStage, Session, SessionController, SessionKind, SessionState,
    TouchGrassStroll, TrackingContext, UsageTracker, UsageWindow,
};
pub use stats::{StatsService, UserStats};
pub use storage::{Backend, Config, Database, MemoryStore, SessionStore};
pub use timer::{IntervalTracker, Milestone, Ticker};
pub use user::{StaticUser, UserProvider};

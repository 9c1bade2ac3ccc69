//! Offline and touch-grass sessions plus in-app usage windows.

mod context;
mod controller;
mod model;
mod stroll;
mod usage;

pub use context::TrackingContext;
pub use controller::SessionController;
pub use model::{rewards_for, AppUsageLog, Session, SessionKind, SessionState};
pub use stroll::{level_for, PlantGrowth, PlantStage, TouchGrassStroll};
pub use usage::{OpenWindow, UsageTracker, UsageWindow};

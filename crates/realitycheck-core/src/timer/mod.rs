mod ticker;
mod tracker;

pub use ticker::Ticker;
pub use tracker::{IntervalTracker, Milestone, Tick, TrackerState};

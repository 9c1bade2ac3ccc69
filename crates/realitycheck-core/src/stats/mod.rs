//! Statistics for offline sessions.
//!
//! Totals, session counts and daily streaks, recomputed whenever an
//! offline session completes.

mod aggregator;
mod service;

pub use aggregator::{aggregate, apply_completed, next_streak, SessionTotals, UserStats};
pub use service::StatsService;

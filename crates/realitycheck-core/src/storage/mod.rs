//! Backing store for sessions, usage logs and user stats.
//!
//! [`SessionStore`] is the seam between the session logic and persistence.
//! [`Database`] is the SQLite implementation, [`MemoryStore`] the in-memory
//! one used as the mock fallback, and [`Backend`] picks between them once
//! at startup.

mod backend;
mod config;
pub mod database;
mod memory;
pub mod migrations;
mod traits;

pub use backend::{Backend, MOCK_USER_ID};
pub use config::{BackendConfig, BlockListConfig, BlockedApp, Config, TrackingConfig, UserConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use traits::SessionStore;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the data directory, creating it if needed.
///
/// `REALITYCHECK_DATA_DIR` wins when set. Otherwise the directory is
/// `~/.config/realitycheck[-dev]/`, with `REALITYCHECK_ENV=dev` selecting
/// the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("REALITYCHECK_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("REALITYCHECK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("realitycheck-dev")
            } else {
                base_dir.join("realitycheck")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

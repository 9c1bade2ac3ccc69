//! Core error types for realitycheck-core.
//!
//! This module defines the error hierarchy using thiserror. Every fallible
//! operation in the library returns [`Result`], and the CLI turns errors
//! into a short message with [`CoreError::user_message`].

use std::path::PathBuf;
use thiserror::Error;

use crate::session::{SessionKind, SessionState};

/// Core error type for realitycheck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Backing store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A command needed an active session but there is none.
    #[error("No active {kind} session")]
    NoActiveSession { kind: SessionKind },

    /// A start was requested while a session is still open.
    #[error("A {kind} session is already active ({id})")]
    SessionAlreadyActive { kind: SessionKind, id: String },

    /// The requested action is not valid from the current state.
    #[error("Cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Normalized, human-readable message for display to the user.
    ///
    /// Storage internals are collapsed into a generic message; state
    /// machine errors keep their specific wording.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Store(StoreError::ActiveSessionExists { .. }) => {
                "A session is already running. End it before starting a new one.".to_string()
            }
            CoreError::Store(StoreError::SessionFinalized { .. }) => {
                "This session has already ended.".to_string()
            }
            CoreError::Store(StoreError::Unavailable(_)) => {
                "The server is unreachable. Please try again later.".to_string()
            }
            CoreError::Store(_) => "Could not save your session. Please try again.".to_string(),
            CoreError::Config(e) => e.to_string(),
            CoreError::Io(_) | CoreError::Json(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Backing-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A second open session for the same user and kind was rejected.
    #[error("User {user_id} already has an active {kind} session")]
    ActiveSessionExists { user_id: String, kind: SessionKind },

    /// Ended sessions are immutable.
    #[error("Session {id} has already ended")]
    SessionFinalized { id: String },

    /// The row to update does not exist.
    #[error("Session {id} not found")]
    NotFound { id: String },

    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/data directory could not be prepared
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end_time ({end}) must not precede start_time ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

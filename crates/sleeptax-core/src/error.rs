//! Core error types for sleeptax-core.
//!
//! Every failure a caller can act on has its own variant and a stable
//! machine-readable code (see [`CoreError::code`]), so front ends can
//! surface "pledge first" prompts instead of generic failures.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for sleeptax-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Pledge amount outside the allowed range
    #[error("Pledge must be between ${min} and ${max} (got {amount})")]
    InvalidAmount { amount: f64, min: f64, max: f64 },

    /// A pledge already exists for this user and week
    #[error("You have already pledged for this week")]
    AlreadyPledged,

    /// Sleep logging attempted without a pledge for the active week
    #[error("Pledge required: make a pledge for the current week before logging sleep")]
    PledgeRequired,

    /// A sleep entry already exists for this user and wake date
    #[error("Sleep already logged for {wake_date}")]
    DuplicateEntry { wake_date: chrono::NaiveDate },

    /// Sleep hours outside the allowed range
    #[error("Sleep hours must be between {min} and {max} (got {hours})")]
    InvalidHours { hours: f64, min: f64, max: f64 },

    /// Caller lacks permission for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No authenticated identity
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The storage collaborator failed
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The week is closed (or was closed concurrently)
    #[error("Week {0} is not active")]
    WeekNotActive(String),

    /// Group reached its member limit
    #[error("Group is full ({max} members)")]
    GroupFull { max: u32 },

    /// A record with the same identity already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unparseable calendar date
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Stable error code for structured error responses.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidAmount { .. } => "INVALID_AMOUNT",
            CoreError::AlreadyPledged => "ALREADY_PLEDGED",
            CoreError::PledgeRequired => "PLEDGE_REQUIRED",
            CoreError::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            CoreError::InvalidHours { .. } => "INVALID_HOURS",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::NotAuthenticated => "NOT_AUTHENTICATED",
            CoreError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::WeekNotActive(_) => "WEEK_NOT_ACTIVE",
            CoreError::GroupFull { .. } => "GROUP_FULL",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::InvalidDate(_) => "INVALID_DATE",
            CoreError::Config(_) => "CONFIG",
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Storage collaborator errors.
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

    /// A previous writer panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                StoreError::Locked
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

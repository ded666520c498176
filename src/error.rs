//! Error types for the cadence event engine.

use thiserror::Error;

/// Main error type for cadence operations.
#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejections raised before any mutation takes place.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("recurrence interval must be at least 1, got {0}")]
    Interval(u32),

    #[error("end_after and end_date cannot both be set")]
    ConflictingBounds,

    #[error("end_after must be at least 1, got {0}")]
    EndAfter(u32),

    #[error("day_of_month must be 1..=31, got {0}")]
    DayOfMonth(u32),

    #[error("month_of_year must be 1..=12, got {0}")]
    MonthOfYear(u32),

    #[error("day_of_week must be 0..=6 (0 = Sunday), got {0}")]
    DayOfWeek(u8),

    #[error("event end date is required")]
    MissingEnd,

    #[error("event start {start} must be before end {end}")]
    StartNotBeforeEnd {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
}

/// A record the operation needed does not exist.
#[derive(Error, Debug)]
pub enum NotFoundError {
    #[error("event not found: {0}")]
    Event(String),

    #[error("series template not found: {0}")]
    Template(String),

    #[error("no invitation for user {user_id} on event {event_id}")]
    Invitation { event_id: String, user_id: String },
}

/// The caller is not allowed to perform the operation.
#[derive(Error, Debug)]
pub enum PermissionError {
    #[error("{email} is not the owner of event {event_id}")]
    NotOwner { event_id: String, email: String },
}

/// Failures raised by the persistence collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("event id already exists: {0}")]
    DuplicateId(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;

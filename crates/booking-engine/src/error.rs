//! Error types for booking-engine operations.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::report::ConflictReport;

#[derive(Error, Debug)]
pub enum BookingError {
    /// The event's stop does not come after its start. Raised before any check runs.
    #[error("Invalid interval for event '{event}': stop {stop} is not after start {start}")]
    InvalidInterval {
        event: String,
        start: NaiveDateTime,
        stop: NaiveDateTime,
    },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Expansion error: {0}")]
    Expansion(String),

    /// A wall-clock time that does not exist in the timezone (spring-forward gap).
    #[error("Local time {0} does not exist in timezone {1}")]
    NonexistentLocalTime(NaiveDateTime, String),

    #[error("Event store error: {0}")]
    Store(String),

    /// The event store read naive times differently than this validation would.
    #[error("Event store localizes naive times with {store}, but validation uses {validation}")]
    LocalizationMismatch { store: String, validation: String },

    #[error("Working calendar error: {0}")]
    Calendar(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Validation found at least one violation.
    #[error("{0}")]
    Rejected(ConflictReport),
}

pub type Result<T> = std::result::Result<T, BookingError>;

//! Error types for slot-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

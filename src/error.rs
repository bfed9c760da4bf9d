//! Error types for blockanim
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in the animation engine
#[derive(Debug, Error)]
pub enum AnimError {
    /// Malformed arguments, rejected before any state change
    #[error("Invalid input: {0}")]
    Input(String),

    /// Loop count, index or clipboard size out of representable range
    #[error("Capacity exceeded: {0}")]
    Capacity(String),

    /// Animation file could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// No animation state registered for the map
    #[error("Map not found: {0}")]
    MapNotFound(String),

    /// Background task could not be started
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// IO error without a more specific cause, e.g. a failed directory entry read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnimError {
    /// True for errors caused by the caller's arguments
    pub fn is_input(&self) -> bool {
        matches!(self, AnimError::Input(_))
    }

    /// True for errors caused by hitting a size limit
    pub fn is_capacity(&self) -> bool {
        matches!(self, AnimError::Capacity(_))
    }
}

/// Result type alias for animation operations
pub type Result<T> = std::result::Result<T, AnimError>;

//! Unified error hierarchy for WaveCycle
//!
//! Validation failures at the construction boundary, caller errors such as
//! an out-of-range week index, and persistence failures all surface through
//! [`PlannerError`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all WaveCycle operations
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Rejected input (duration, freshness, completion, wellbeing, dates)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Week index outside the cycle's week list
    #[error("Week index {index} out of range for a cycle of {len} weeks")]
    WeekOutOfRange { index: usize, len: usize },

    /// Cycle lookup by id failed
    #[error("Cycle not found: {0}")]
    CycleNotFound(String),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by [`crate::storage::CycleStore`] implementations
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite backend failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File system failure while reading or writing cycle data
    #[error("Storage IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stored revision is newer than the one being written
    #[error("Revision conflict for cycle {id}: stored {stored}, attempted {attempted}")]
    Conflict { id: String, stored: u64, attempted: u64 },

    /// Another writer added or removed a cycle since this writer's last load
    #[error("Cycle {id} was {change} by another writer")]
    ConcurrentChange { id: String, change: &'static str },
}

/// Result type alias for WaveCycle operations
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlannerError::Validation(_) => ErrorSeverity::Warning,
            PlannerError::CycleNotFound(_) => ErrorSeverity::Warning,
            PlannerError::Storage(StorageError::Conflict { .. })
            | PlannerError::Storage(StorageError::ConcurrentChange { .. }) => ErrorSeverity::Warning,
            PlannerError::WeekOutOfRange { .. } => ErrorSeverity::Error,
            PlannerError::Storage(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::WeekOutOfRange { index, len } => {
                format!(
                    "Week {} does not exist; this cycle has weeks 1 to {}.",
                    index + 1,
                    len
                )
            }
            PlannerError::Storage(StorageError::Conflict { .. })
            | PlannerError::Storage(StorageError::ConcurrentChange { .. }) => {
                "This cycle was changed elsewhere. Reload it and try again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Rejected input; the caller can correct and retry
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

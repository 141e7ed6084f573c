// Library interface for WaveCycle
// The CLI and integration tests go through these modules

pub mod adaptation;
pub mod aggregation;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod planner;
pub mod storage;
pub mod wave;

// Re-export commonly used types for convenience
pub use adaptation::{adjust_next, log_week, recommend, Recommendation, WeekLogOutcome};
pub use aggregation::{insights, CycleSummary, Insight, WeekMetrics};
pub use error::{PlannerError, Result, StorageError};
pub use models::*;
pub use planner::{current_recommendation, CycleBuilder, CyclePlanner};
pub use storage::{CycleStore, JsonFileStore, MemoryStore, Snapshot, SqliteStore};
pub use wave::{generate_wave, WaveShape};

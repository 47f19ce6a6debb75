//! Storage Layer
//!
//! Append-only CSV log of per-frame drowsiness results.

mod config;
mod record;
mod session_log;

pub use config::{LogConfig, LogFailurePolicy};
pub use record::{AlertFlag, LogRecord, LOG_HEADER, TIMESTAMP_FORMAT};
pub use session_log::{ensure_log_initialized, read_records, validate_header, SessionLogger};

use std::path::PathBuf;
use thiserror::Error;

/// Errors creating or appending to the session log
#[derive(Debug, Error)]
pub enum LogWriteError {
    #[error("Failed to write log {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Log {path} has header {found:?}, expected {expected:?}")]
    SchemaMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("Log is closed")]
    Closed,
}

/// Errors reading a session log back
#[derive(Debug, Error)]
pub enum LogReadError {
    #[error("Failed to read log: {0}")]
    Io(String),

    #[error("Malformed log line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

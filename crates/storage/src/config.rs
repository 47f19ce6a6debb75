//! Session log configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the frame loop does when the log cannot be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFailurePolicy {
    /// Warn and keep monitoring without the log
    #[default]
    Continue,
    /// Stop the session
    Abort,
}

/// Session log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// CSV file the records are appended to
    pub path: PathBuf,
    pub on_write_error: LogFailurePolicy,
    /// Refuse a pre-existing log whose header differs
    pub validate_header: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("drowsiness_log.csv"),
            on_write_error: LogFailurePolicy::Continue,
            validate_header: false,
        }
    }
}

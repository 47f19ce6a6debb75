//! Driver Drowsiness Monitor
//!
//! Wires the frame source, landmark detector, drowsiness scorer, alert
//! controller and session log into a single-threaded frame loop.

pub mod config;
pub mod session;

pub use config::MonitorConfig;
pub use session::{build_session, MonitorSession, SessionStats};

use camera_capture::CameraError;
use dms::DmsError;
use storage::LogWriteError;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Capture(#[from] CameraError),

    #[error(transparent)]
    Dms(#[from] DmsError),

    #[error(transparent)]
    Log(#[from] LogWriteError),
}

impl From<::config::ConfigError> for MonitorError {
    fn from(err: ::config::ConfigError) -> Self {
        MonitorError::Config(err.to_string())
    }
}

impl MonitorError {
    /// Process exit code: 1 startup failure, 2 bad configuration, 3 log
    /// failure under the abort policy
    pub fn exit_code(&self) -> u8 {
        match self {
            MonitorError::Config(_) | MonitorError::Dms(DmsError::Config(_)) => 2,
            MonitorError::Log(_) => 3,
            MonitorError::Capture(_) | MonitorError::Dms(_) => 1,
        }
    }
}

/// Initialize logging. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

//! Alerting System
//!
//! Decides from the drowsiness score whether a frame is in alert, applies the
//! re-trigger policy, and hands the alert to a sound sink.

mod manager;
mod sink;

pub use manager::{AlertConfig, AlertController, AlertOutcome, AlertPhase, AlertPolicy};
pub use sink::{AlertSink, CommandSink, SilentSink};

use std::path::PathBuf;
use thiserror::Error;

/// Alert playback errors. Never fatal to the frame loop.
#[derive(Debug, Error)]
pub enum AlertDeliveryError {
    #[error("Alert sound not found: {0}")]
    SoundMissing(PathBuf),

    #[error("Failed to start alert player {program}: {reason}")]
    Spawn { program: String, reason: String },
}

//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides the frame source seam consumed by the monitor loop:
//! - `FrameSource` trait (open / read / release)
//! - Decoded RGB `VideoFrame`
//! - `ImageSequenceSource` replaying a directory of still frames

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequenceSource};

use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    /// Source could not be opened (fatal at startup)
    #[error("Failed to open camera: {0}")]
    Open(String),

    /// A single frame could not be read or decoded
    #[error("Failed to read frame {sequence}: {reason}")]
    Read { sequence: u32, reason: String },

    #[error("Camera not initialized")]
    NotInitialized,
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Directory holding the frame images, read in file name order
    pub device: PathBuf,
    /// Stop after this many frames
    pub max_frames: Option<u32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("frames"),
            max_frames: None,
        }
    }
}

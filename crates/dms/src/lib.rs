//! Driver Monitoring System (DMS)
//!
//! Per-frame drowsiness analysis from facial landmarks:
//! - Eye landmark extraction (detector numbering -> 6-point eye contour)
//! - Eye Aspect Ratio (EAR) per eye, averaged into a frame signal
//! - Leaky-bucket drowsiness score

pub mod analysis;
pub mod config;
pub mod detector;
pub mod ear;
pub mod landmarks;
pub mod scorer;

pub use analysis::{DmsAnalysis, FrameSignal};
pub use config::DmsConfig;
pub use detector::{LandmarkDetector, TraceDetector};
pub use ear::{calculate_ear, mean_ear};
pub use landmarks::{EyeIndexSet, EyeLandmarks, FaceLandmarks, Point};
pub use scorer::DrowsinessScorer;

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::debug;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Landmark source loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid eye landmarks: {0}")]
    InvalidLandmarks(String),

    #[error("Degenerate eye geometry: corner distance is zero")]
    DegenerateGeometry,

    #[error("Invalid EAR signal: {0}")]
    InvalidSignal(f64),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Driver monitoring module
pub struct DmsModule<D> {
    config: DmsConfig,
    detector: D,
    scorer: DrowsinessScorer,
}

impl<D: LandmarkDetector> DmsModule<D> {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig, detector: D) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            scorer: DrowsinessScorer::new(config.ear_threshold),
            detector,
            config,
        })
    }

    /// Analyze a single frame.
    ///
    /// No face leaves the score untouched. On error the score is also left
    /// untouched and the caller should skip the frame.
    pub fn analyze(&mut self, frame: &VideoFrame) -> Result<DmsAnalysis, DmsError> {
        let faces = self.detector.process(frame)?;

        let Some(face) = faces.first() else {
            debug!("Frame {}: no face", frame.sequence);
            return Ok(DmsAnalysis {
                sequence: frame.sequence,
                signal: None,
                score: self.scorer.score(),
            });
        };

        let signal = self.frame_signal(face, frame.width, frame.height)?;
        let score = self.scorer.update(signal.ear)?;

        Ok(DmsAnalysis {
            sequence: frame.sequence,
            signal: Some(signal),
            score,
        })
    }

    fn frame_signal(
        &self,
        face: &FaceLandmarks,
        width: u32,
        height: u32,
    ) -> Result<FrameSignal, DmsError> {
        let left = face.eye(&self.config.left_eye, width, height)?;
        let right = face.eye(&self.config.right_eye, width, height)?;

        let left_ear = calculate_ear(&left)?;
        let right_ear = calculate_ear(&right)?;

        Ok(FrameSignal {
            left_ear,
            right_ear,
            ear: mean_ear(left_ear, right_ear),
        })
    }

    /// Current drowsiness score
    pub fn score(&self) -> u32 {
        self.scorer.score()
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }
}

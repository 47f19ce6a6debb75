//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::landmarks::EyeIndexSet;
use crate::DmsError;

/// Default EAR below which a frame counts as eyes-closed
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Mean EAR strictly below this value increments the drowsiness score
    pub ear_threshold: f64,

    /// Landmark numbers of the left eye contour
    pub left_eye: EyeIndexSet,

    /// Landmark numbers of the right eye contour
    pub right_eye: EyeIndexSet,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            left_eye: EyeIndexSet::MEDIAPIPE_LEFT,
            right_eye: EyeIndexSet::MEDIAPIPE_RIGHT,
        }
    }
}

impl DmsConfig {
    /// Reject thresholds the scorer cannot compare against
    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        Ok(())
    }
}

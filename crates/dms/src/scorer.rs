//! Drowsiness score tracking

use tracing::trace;

use crate::config::DEFAULT_EAR_THRESHOLD;
use crate::DmsError;

/// Leaky-bucket drowsiness score.
///
/// Every eyes-closed frame (EAR below threshold) adds one, every other frame
/// drains one. The score never goes below zero and has no upper cap, so it
/// only climbs past an alert threshold on sustained closure.
#[derive(Debug, Clone)]
pub struct DrowsinessScorer {
    score: u32,
    ear_threshold: f64,
}

impl DrowsinessScorer {
    pub fn new(ear_threshold: f64) -> Self {
        Self {
            score: 0,
            ear_threshold,
        }
    }

    /// Feed one frame's mean EAR and return the updated score.
    ///
    /// Non-finite or negative input is rejected and leaves the score as is.
    pub fn update(&mut self, ear: f64) -> Result<u32, DmsError> {
        if !ear.is_finite() || ear < 0.0 {
            return Err(DmsError::InvalidSignal(ear));
        }

        if ear < self.ear_threshold {
            self.score = self.score.saturating_add(1);
        } else {
            self.score = self.score.saturating_sub(1);
        }

        trace!(ear, score = self.score, "score updated");
        Ok(self.score)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ear_threshold(&self) -> f64 {
        self.ear_threshold
    }
}

impl Default for DrowsinessScorer {
    fn default() -> Self {
        Self::new(DEFAULT_EAR_THRESHOLD)
    }
}

//! DMS analysis results

use serde::{Deserialize, Serialize};

/// Per-frame eye openness signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSignal {
    pub left_ear: f64,
    pub right_ear: f64,
    /// Mean of both eyes, the value the scorer consumes
    pub ear: f64,
}

/// Result of analyzing one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DmsAnalysis {
    /// Frame sequence number
    pub sequence: u32,

    /// Eye signal, present only when a face was detected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<FrameSignal>,

    /// Drowsiness score after this frame
    pub score: u32,
}

impl DmsAnalysis {
    /// Whether a face was detected
    pub fn face_detected(&self) -> bool {
        self.signal.is_some()
    }
}

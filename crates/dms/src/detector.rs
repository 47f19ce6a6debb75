//! Facial landmark detection

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use camera_capture::VideoFrame;
use serde::Deserialize;
use tracing::{debug, info};

use crate::landmarks::FaceLandmarks;
use crate::DmsError;

/// Facial landmark detector.
///
/// Returns every face found in the frame, each with normalized landmarks
/// numbered by the detector's own scheme. An empty list means no face.
pub trait LandmarkDetector {
    fn process(&mut self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError>;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn process(&mut self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        (**self).process(frame)
    }
}

#[derive(Debug, Deserialize)]
struct TraceEntry {
    frame: u32,
    #[serde(default)]
    faces: Vec<FaceLandmarks>,
}

/// Replays landmarks recorded by an external face mesh run.
///
/// The trace is JSON lines, one object per frame:
///
/// ```text
/// {"frame": 0, "faces": [[{"x": 0.41, "y": 0.37}, ...]]}
/// ```
///
/// Frames missing from the trace have no face.
pub struct TraceDetector {
    frames: HashMap<u32, Vec<FaceLandmarks>>,
}

impl TraceDetector {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DmsError> {
        let path = path.as_ref();
        info!("Loading landmark trace from {}", path.display());
        let file = std::fs::File::open(path)
            .map_err(|e| DmsError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, DmsError> {
        let mut frames = HashMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DmsError::ModelLoad(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: TraceEntry = serde_json::from_str(&line)
                .map_err(|e| DmsError::ModelLoad(format!("line {}: {}", line_no + 1, e)))?;
            frames.insert(entry.frame, entry.faces);
        }
        debug!("Landmark trace covers {} frames", frames.len());
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkDetector for TraceDetector {
    fn process(&mut self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        Ok(self.frames.get(&frame.sequence).cloned().unwrap_or_default())
    }
}

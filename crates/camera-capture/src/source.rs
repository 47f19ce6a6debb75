//! Frame sources

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::{CameraConfig, CameraError, VideoFrame};

/// File extensions accepted as frames
const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// A source of video frames.
///
/// `read` returns `Ok(None)` at end of stream, which callers must treat
/// differently from a failed read.
pub trait FrameSource {
    /// Read the next frame
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device. Must be safe to call more than once.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Replays a directory of still images as a video stream
pub struct ImageSequenceSource {
    pending: VecDeque<PathBuf>,
    sequence: u32,
    max_frames: Option<u32>,
    opened_at: Instant,
    released: bool,
}

impl ImageSequenceSource {
    /// Open the frame directory named by the config
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let pending = list_frames(&config.device)?;
        if pending.is_empty() {
            return Err(CameraError::Open(format!(
                "no frames found in {}",
                config.device.display()
            )));
        }

        info!(
            "Opened frame source {} ({} frames)",
            config.device.display(),
            pending.len()
        );

        Ok(Self {
            pending,
            sequence: 0,
            max_frames: config.max_frames,
            opened_at: Instant::now(),
            released: false,
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.released {
            return Err(CameraError::NotInitialized);
        }
        if self.max_frames.is_some_and(|max| self.sequence >= max) {
            return Ok(None);
        }
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let sequence = self.sequence;
        self.sequence += 1;

        let img = image::open(&path).map_err(|e| CameraError::Read {
            sequence,
            reason: format!("{}: {}", path.display(), e),
        })?;
        let timestamp_ns = self.opened_at.elapsed().as_nanos() as u64;
        debug!("Decoded frame {} from {}", sequence, path.display());

        Ok(Some(VideoFrame::from_image(img, timestamp_ns, sequence)))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.pending.clear();
            info!("Frame source released after {} frames", self.sequence);
        }
    }
}

impl Drop for ImageSequenceSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn list_frames(dir: &Path) -> Result<VecDeque<PathBuf>, CameraError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

    let mut frames = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?
            .path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if path.is_file() && is_frame {
            frames.push(path);
        }
    }
    frames.sort();

    Ok(frames.into())
}

//! Alert sound delivery

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::AlertDeliveryError;

/// Plays the alert sound. Must not block the caller.
pub trait AlertSink {
    fn play(&mut self) -> Result<(), AlertDeliveryError>;
}

impl<S: AlertSink + ?Sized> AlertSink for Box<S> {
    fn play(&mut self) -> Result<(), AlertDeliveryError> {
        (**self).play()
    }
}

/// Starts an external audio player per alert without waiting for it
pub struct CommandSink {
    program: String,
    sound_path: PathBuf,
    running: Vec<Child>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, sound_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            sound_path: sound_path.into(),
            running: Vec::new(),
        }
    }

    pub fn sound_path(&self) -> &Path {
        &self.sound_path
    }

    /// Players still running
    pub fn in_flight(&mut self) -> usize {
        self.reap();
        self.running.len()
    }

    fn reap(&mut self) {
        self.running
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl AlertSink for CommandSink {
    fn play(&mut self) -> Result<(), AlertDeliveryError> {
        self.reap();

        if !self.sound_path.is_file() {
            return Err(AlertDeliveryError::SoundMissing(self.sound_path.clone()));
        }

        let child = Command::new(&self.program)
            .arg(&self.sound_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AlertDeliveryError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        debug!("Alert player started (pid {})", child.id());
        self.running.push(child);
        Ok(())
    }
}

/// Headless sink that only logs
#[derive(Debug, Default)]
pub struct SilentSink;

impl AlertSink for SilentSink {
    fn play(&mut self) -> Result<(), AlertDeliveryError> {
        warn!("Alert sound requested (silent mode)");
        Ok(())
    }
}

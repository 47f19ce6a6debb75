//! Frame loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alerting::{AlertController, AlertSink, CommandSink, SilentSink};
use camera_capture::{CameraConfig, FrameSource, ImageSequenceSource};
use dms::{DmsModule, LandmarkDetector, TraceDetector};
use metrics::counter;
use serde::Serialize;
use storage::{LogFailurePolicy, LogRecord, SessionLogger};
use tracing::{debug, error, info, warn};

use crate::{MonitorConfig, MonitorError};

/// Counters for one monitoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_read: u64,
    pub faces_detected: u64,
    pub faces_missing: u64,
    /// Frames dropped on a per-frame error (bad geometry, detector failure)
    pub frames_skipped: u64,
    pub records_logged: u64,
    pub alert_frames: u64,
    pub alert_delivery_failures: u64,
    pub peak_score: u32,
    pub final_score: u32,
}

/// One monitoring session: owns the source, the score, and the log
pub struct MonitorSession<S, D, K> {
    source: S,
    dms: DmsModule<D>,
    alerts: AlertController<K>,
    logger: Option<SessionLogger>,
    log_policy: LogFailurePolicy,
    stop: Arc<AtomicBool>,
    stats: SessionStats,
}

impl<S, D, K> MonitorSession<S, D, K>
where
    S: FrameSource,
    D: LandmarkDetector,
    K: AlertSink,
{
    pub fn new(
        source: S,
        dms: DmsModule<D>,
        alerts: AlertController<K>,
        logger: Option<SessionLogger>,
        log_policy: LogFailurePolicy,
    ) -> Self {
        Self {
            source,
            dms,
            alerts,
            logger,
            log_policy,
            stop: Arc::new(AtomicBool::new(false)),
            stats: SessionStats::default(),
        }
    }

    /// Flag that ends the loop before the next frame when set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Run until end of stream, a failed read, or a stop request.
    ///
    /// The source is released and the log closed on every exit path.
    pub fn run(mut self) -> Result<SessionStats, MonitorError> {
        info!("Monitoring started");
        let result = self.run_frames();
        self.teardown();

        self.stats.final_score = self.dms.score();
        info!(
            frames = self.stats.frames_read,
            faces = self.stats.faces_detected,
            skipped = self.stats.frames_skipped,
            logged = self.stats.records_logged,
            alert_frames = self.stats.alert_frames,
            peak_score = self.stats.peak_score,
            final_score = self.stats.final_score,
            "Monitoring stopped"
        );

        result.map(|()| self.stats)
    }

    fn run_frames(&mut self) -> Result<(), MonitorError> {
        while !self.stop.load(Ordering::SeqCst) {
            if !self.step()? {
                return Ok(());
            }
        }
        info!("Stop requested");
        Ok(())
    }

    /// Process one frame. Returns false when the stream is over.
    fn step(&mut self) -> Result<bool, MonitorError> {
        let frame = match self.source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("End of stream");
                return Ok(false);
            }
            Err(e) => {
                warn!("Failed to grab frame, stopping: {}", e);
                return Ok(false);
            }
        };
        self.stats.frames_read += 1;
        counter!("monitor_frames_total").increment(1);

        let analysis = match self.dms.analyze(&frame) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Frame {} skipped: {}", frame.sequence, e);
                self.stats.frames_skipped += 1;
                counter!("monitor_frame_errors_total").increment(1);
                return Ok(true);
            }
        };

        let Some(signal) = analysis.signal else {
            self.stats.faces_missing += 1;
            counter!("monitor_faces_missing_total").increment(1);
            return Ok(true);
        };
        self.stats.faces_detected += 1;
        self.stats.peak_score = self.stats.peak_score.max(analysis.score);

        let outcome = self.alerts.on_frame(analysis.score);
        if outcome.active {
            self.stats.alert_frames += 1;
            counter!("monitor_alerts_total").increment(1);
        }
        if outcome.delivery_failed {
            self.stats.alert_delivery_failures += 1;
        }

        debug!(
            frame = frame.sequence,
            alert = outcome.active,
            "EAR: {:.2} SCORE: {}",
            signal.ear,
            analysis.score
        );

        self.log(&LogRecord::now(signal.ear, analysis.score, outcome.active))?;
        Ok(true)
    }

    fn log(&mut self, record: &LogRecord) -> Result<(), MonitorError> {
        let Some(logger) = self.logger.as_mut() else {
            return Ok(());
        };

        match logger.append(record) {
            Ok(()) => {
                self.stats.records_logged += 1;
                Ok(())
            }
            Err(e) => match self.log_policy {
                LogFailurePolicy::Abort => {
                    error!("Log write failed: {}", e);
                    Err(e.into())
                }
                LogFailurePolicy::Continue => {
                    warn!("Log write failed, continuing without log: {}", e);
                    self.logger = None;
                    Ok(())
                }
            },
        }
    }

    fn teardown(&mut self) {
        self.source.release();
        if let Some(mut logger) = self.logger.take() {
            if let Err(e) = logger.close() {
                warn!("Failed to close log: {}", e);
            }
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

/// Session over the configured frame directory and landmark trace
pub type ConfiguredSession =
    MonitorSession<ImageSequenceSource, TraceDetector, Box<dyn AlertSink + Send>>;

/// Open everything the config names.
///
/// Source and detector failures are fatal. A log that cannot be opened is
/// fatal only under the abort policy.
pub fn build_session(config: &MonitorConfig) -> Result<ConfiguredSession, MonitorError> {
    let source = ImageSequenceSource::open(&CameraConfig::from(&config.source))?;
    let detector = TraceDetector::open(&config.detector.trace_path)?;
    let dms = DmsModule::new(config.dms.clone(), detector)?;

    let sink: Box<dyn AlertSink + Send> = if config.alert.silent {
        Box::new(SilentSink)
    } else {
        if !config.alert.sound_path.is_file() {
            warn!(
                "Alert sound {} not found; alerts will only be logged",
                config.alert.sound_path.display()
            );
        }
        Box::new(CommandSink::new(
            config.alert.player.clone(),
            config.alert.sound_path.clone(),
        ))
    };
    let alerts = AlertController::new(config.alert.clone(), sink);

    let logger = match SessionLogger::open(&config.log) {
        Ok(logger) => Some(logger),
        Err(e) if config.log.on_write_error == LogFailurePolicy::Continue => {
            warn!("Session log unavailable, continuing without it: {}", e);
            None
        }
        Err(e) => return Err(e.into()),
    };

    Ok(MonitorSession::new(
        source,
        dms,
        alerts,
        logger,
        config.log.on_write_error,
    ))
}

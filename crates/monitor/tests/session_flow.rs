use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::Ordering;

use alerting::{AlertConfig, AlertController, AlertDeliveryError, AlertSink};
use camera_capture::{CameraError, FrameSource, VideoFrame};
use dms::{DmsConfig, DmsError, DmsModule, EyeIndexSet, FaceLandmarks, LandmarkDetector, Point};
use monitor::{build_session, MonitorConfig, MonitorError, MonitorSession, SessionStats};
use storage::{read_records, AlertFlag, LogConfig, LogFailurePolicy, SessionLogger};

const FRAME_SIZE: u32 = 1024;

/// Scripted frame source; an `Err` entry simulates a failed grab
struct ScriptedSource {
    frames: VecDeque<Result<(), ()>>,
    next_sequence: u32,
    released: Rc<Cell<bool>>,
}

impl ScriptedSource {
    fn new(frames: usize) -> (Self, Rc<Cell<bool>>) {
        Self::with(std::iter::repeat(Ok(())).take(frames).collect())
    }

    fn with(frames: VecDeque<Result<(), ()>>) -> (Self, Rc<Cell<bool>>) {
        let released = Rc::new(Cell::new(false));
        (
            Self {
                frames,
                next_sequence: 0,
                released: released.clone(),
            },
            released,
        )
    }
}

impl FrameSource for ScriptedSource {
    fn read(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        match self.frames.pop_front() {
            None => Ok(None),
            Some(Ok(())) => Ok(Some(VideoFrame::blank(FRAME_SIZE, FRAME_SIZE, sequence))),
            Some(Err(())) => Err(CameraError::Read {
                sequence,
                reason: "device unplugged".into(),
            }),
        }
    }

    fn release(&mut self) {
        self.released.set(true);
    }
}

/// What the detector reports for one frame
#[derive(Clone, Copy)]
enum Face {
    /// Both eyes at this EAR
    Ear(f64),
    Missing,
    Collapsed,
}

struct ScriptedDetector(VecDeque<Face>);

impl LandmarkDetector for ScriptedDetector {
    fn process(&mut self, _frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DmsError> {
        Ok(match self.0.pop_front() {
            Some(Face::Ear(ear)) => vec![face_with_ear(ear)],
            Some(Face::Collapsed) => vec![FaceLandmarks::new(vec![Point::new(0.5, 0.5); 478])],
            Some(Face::Missing) | None => Vec::new(),
        })
    }
}

/// Eyes 160 px wide with lids `80 * ear` px off the corner line, so
/// EAR = 4 * lid / 320. Pixel values are whole and sizes a power of two,
/// which keeps normalization exact.
fn face_with_ear(ear: f64) -> FaceLandmarks {
    let lid = (ear * 80.0).round();
    let mut points = vec![Point::default(); 478];
    for (set, x0) in [(EyeIndexSet::MEDIAPIPE_LEFT, 256.0), (EyeIndexSet::MEDIAPIPE_RIGHT, 576.0)] {
        let shape = [
            (0.0, 0.0),
            (40.0, -lid),
            (120.0, -lid),
            (160.0, 0.0),
            (120.0, lid),
            (40.0, lid),
        ];
        for (index, (dx, dy)) in set.indices().into_iter().zip(shape) {
            let size = FRAME_SIZE as f64;
            points[index] = Point::new((x0 + dx) / size, (512.0 + dy) / size);
        }
    }
    FaceLandmarks::new(points)
}

#[derive(Clone, Default)]
struct CountingSink(Rc<Cell<u32>>);

impl AlertSink for CountingSink {
    fn play(&mut self) -> Result<(), AlertDeliveryError> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

struct Harness {
    session: MonitorSession<ScriptedSource, ScriptedDetector, CountingSink>,
    released: Rc<Cell<bool>>,
    plays: Rc<Cell<u32>>,
}

fn harness(faces: Vec<Face>, logger: Option<SessionLogger>, policy: LogFailurePolicy) -> Harness {
    let (source, released) = ScriptedSource::new(faces.len());
    let dms = DmsModule::new(DmsConfig::default(), ScriptedDetector(faces.into())).unwrap();
    let sink = CountingSink::default();
    let plays = sink.0.clone();
    let alerts = AlertController::new(AlertConfig::default(), sink);

    Harness {
        session: MonitorSession::new(source, dms, alerts, logger, policy),
        released,
        plays,
    }
}

fn log_config(dir: &std::path::Path) -> LogConfig {
    LogConfig {
        path: dir.join("drowsiness_log.csv"),
        ..Default::default()
    }
}

#[test]
fn sustained_closure_raises_alert_from_sixteenth_closed_frame() {
    let dir = tempfile::tempdir().unwrap();
    let config = log_config(dir.path());

    let mut faces = vec![Face::Ear(0.30)];
    faces.extend(std::iter::repeat(Face::Ear(0.20)).take(16));

    let h = harness(faces, Some(SessionLogger::open(&config).unwrap()), LogFailurePolicy::Abort);
    let stats = h.session.run().unwrap();

    assert_eq!(stats.frames_read, 17);
    assert_eq!(stats.faces_detected, 17);
    assert_eq!(stats.records_logged, 17);
    assert_eq!(stats.alert_frames, 1);
    assert_eq!(stats.peak_score, 16);
    assert_eq!(stats.final_score, 16);
    assert_eq!(h.plays.get(), 1);
    assert!(h.released.get());

    let records = read_records(&config.path).unwrap();
    let scores: Vec<u32> = records.iter().map(|r| r.score).collect();
    assert_eq!(scores, (0..=16).collect::<Vec<u32>>());

    assert_eq!(records[0].ear, 0.3);
    assert!(records[1..].iter().all(|r| r.ear == 0.2));

    let alerts: Vec<AlertFlag> = records.iter().map(|r| r.alert).collect();
    assert!(alerts[..16].iter().all(|a| *a == AlertFlag::No));
    assert_eq!(alerts[16], AlertFlag::Yes);

    let contents = std::fs::read_to_string(&config.path).unwrap();
    assert!(contents.starts_with("Time,EAR,Score,Alert\n"));
    assert!(contents.trim_end().ends_with(",0.2,16,Yes"));
}

#[test]
fn recovery_drains_score_and_clears_alert() {
    let mut faces: Vec<Face> = std::iter::repeat(Face::Ear(0.1)).take(17).collect();
    faces.extend(std::iter::repeat(Face::Ear(0.35)).take(3));

    let h = harness(faces, None, LogFailurePolicy::Continue);
    let stats = h.session.run().unwrap();

    // Scores 1..=17 then 16, 15, 14: alert on 16, 17, 16
    assert_eq!(stats.alert_frames, 3);
    assert_eq!(stats.peak_score, 17);
    assert_eq!(stats.final_score, 14);
    assert_eq!(h.plays.get(), 3);
}

#[test]
fn missing_and_degenerate_faces_are_not_logged_and_keep_score() {
    let dir = tempfile::tempdir().unwrap();
    let config = log_config(dir.path());

    let faces = vec![
        Face::Ear(0.1),
        Face::Missing,
        Face::Collapsed,
        Face::Ear(0.1),
    ];
    let h = harness(faces, Some(SessionLogger::open(&config).unwrap()), LogFailurePolicy::Abort);
    let stats = h.session.run().unwrap();

    assert_eq!(
        stats,
        SessionStats {
            frames_read: 4,
            faces_detected: 2,
            faces_missing: 1,
            frames_skipped: 1,
            records_logged: 2,
            alert_frames: 0,
            alert_delivery_failures: 0,
            peak_score: 2,
            final_score: 2,
        }
    );

    let scores: Vec<u32> = read_records(&config.path).unwrap().iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![1, 2]);
}

#[test]
fn failed_grab_ends_session_gracefully() {
    let detector = ScriptedDetector(vec![Face::Ear(0.3); 3].into());
    let (source, released) = ScriptedSource::with(vec![Ok(()), Err(()), Ok(())].into());
    let dms = DmsModule::new(DmsConfig::default(), detector).unwrap();
    let alerts = AlertController::new(AlertConfig::default(), CountingSink::default());

    let session = MonitorSession::new(source, dms, alerts, None, LogFailurePolicy::Continue);
    let stats = session.run().unwrap();

    assert_eq!(stats.frames_read, 1);
    assert!(released.get());
}

#[test]
fn stop_request_ends_before_next_frame() {
    let h = harness(vec![Face::Ear(0.1); 5], None, LogFailurePolicy::Continue);
    h.session.stop_handle().store(true, Ordering::SeqCst);

    let stats = h.session.run().unwrap();
    assert_eq!(stats.frames_read, 0);
    assert!(h.released.get());
}

#[test]
fn log_failure_aborts_under_abort_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = SessionLogger::open(&log_config(dir.path())).unwrap();
    logger.close().unwrap();

    let h = harness(vec![Face::Ear(0.1); 3], Some(logger), LogFailurePolicy::Abort);
    let err = h.session.run().unwrap_err();

    assert!(matches!(err, MonitorError::Log(_)));
    assert_eq!(err.exit_code(), 3);
    assert!(h.released.get());
}

#[test]
fn log_failure_continues_under_continue_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = SessionLogger::open(&log_config(dir.path())).unwrap();
    logger.close().unwrap();

    let h = harness(vec![Face::Ear(0.1); 3], Some(logger), LogFailurePolicy::Continue);
    let stats = h.session.run().unwrap();

    assert_eq!(stats.frames_read, 3);
    assert_eq!(stats.records_logged, 0);
    assert_eq!(stats.final_score, 3);
}

#[test]
fn build_session_fails_without_frames() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = MonitorConfig::default();
    config.source.device = dir.path().join("no-frames");
    config.detector.trace_path = dir.path().join("landmarks.jsonl");
    config.log = log_config(dir.path());

    let err = build_session(&config).err().unwrap();
    assert!(matches!(err, MonitorError::Capture(CameraError::Open(_))));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn build_session_replays_frames_and_trace() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).unwrap();
    for i in 0..3 {
        image::RgbImage::new(FRAME_SIZE, FRAME_SIZE)
            .save(frames.join(format!("{:04}.png", i)))
            .unwrap();
    }

    let trace_path = dir.path().join("landmarks.jsonl");
    let mut trace = String::new();
    for (frame, ear) in [(0, 0.1), (2, 0.1)] {
        let faces = serde_json::to_string(&vec![face_with_ear(ear)]).unwrap();
        trace.push_str(&format!("{{\"frame\": {}, \"faces\": {}}}\n", frame, faces));
    }
    std::fs::write(&trace_path, trace).unwrap();

    let mut config = MonitorConfig::default();
    config.source.device = frames;
    config.detector.trace_path = trace_path;
    config.alert.silent = true;
    config.log = log_config(dir.path());

    let stats = build_session(&config).unwrap().run().unwrap();
    assert_eq!(stats.frames_read, 3);
    assert_eq!(stats.faces_detected, 2);
    assert_eq!(stats.faces_missing, 1);
    assert_eq!(stats.final_score, 2);
    assert_eq!(read_records(&config.log.path).unwrap().len(), 2);
}

//! Alert Controller Implementation

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::sink::AlertSink;
use crate::AlertDeliveryError;

/// Default score above which a frame is in alert
pub const DEFAULT_SCORE_THRESHOLD: u32 = 15;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Alert when the score is strictly greater than this (default: 15)
    pub score_threshold: u32,
    /// Sound played on alert
    pub sound_path: PathBuf,
    /// External player invoked as `<player> <sound_path>`
    pub player: String,
    /// Minimum gap between sounds while the alert holds. `None` sounds
    /// on every alert frame.
    pub cooldown_ms: Option<u64>,
    /// Log alerts instead of playing a sound
    pub silent: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            sound_path: PathBuf::from("alarm.wav"),
            player: "aplay".to_string(),
            cooldown_ms: None,
            silent: false,
        }
    }
}

impl AlertConfig {
    pub fn policy(&self) -> AlertPolicy {
        match self.cooldown_ms {
            Some(ms) if ms > 0 => AlertPolicy::Cooldown(Duration::from_millis(ms)),
            _ => AlertPolicy::EveryFrame,
        }
    }
}

/// When to sound again while the alert condition keeps holding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// Sound on every alert frame, even if the previous sound is still playing
    EveryFrame,
    /// Sound at most once per interval
    Cooldown(Duration),
}

/// Re-trigger state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPhase {
    /// Score at or below threshold
    Idle,
    /// Sounded on this frame
    Alerting,
    /// Alert holds but the sound is suppressed
    Cooldown,
}

/// What the controller did for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertOutcome {
    /// Alert condition holds (this is what gets logged)
    pub active: bool,
    /// A sound was requested
    pub sounded: bool,
    /// The sink failed to deliver the sound
    pub delivery_failed: bool,
}

/// Drowsiness alert controller
pub struct AlertController<S> {
    config: AlertConfig,
    policy: AlertPolicy,
    sink: S,
    phase: AlertPhase,
    last_sounded: Option<Instant>,
    sound_count: u64,
}

impl<S: AlertSink> AlertController<S> {
    /// Create a new alert controller
    pub fn new(config: AlertConfig, sink: S) -> Self {
        let policy = config.policy();
        info!(
            "Creating alert controller: threshold {}, policy {:?}",
            config.score_threshold, policy
        );
        Self {
            config,
            policy,
            sink,
            phase: AlertPhase::Idle,
            last_sounded: None,
            sound_count: 0,
        }
    }

    /// Whether the score puts this frame in alert. Depends only on the score.
    pub fn should_alert(&self, score: u32) -> bool {
        score > self.config.score_threshold
    }

    /// Request one alert sound
    pub fn trigger_alert(&mut self) -> Result<(), AlertDeliveryError> {
        self.sound_count += 1;
        self.sink.play()
    }

    /// Handle one frame's score
    pub fn on_frame(&mut self, score: u32) -> AlertOutcome {
        self.on_frame_at(score, Instant::now())
    }

    /// Handle one frame's score at a given time
    pub fn on_frame_at(&mut self, score: u32, now: Instant) -> AlertOutcome {
        if !self.should_alert(score) {
            if self.phase != AlertPhase::Idle {
                info!("Alert cleared at score {}", score);
            }
            self.phase = AlertPhase::Idle;
            return AlertOutcome {
                active: false,
                sounded: false,
                delivery_failed: false,
            };
        }

        let due = match (self.policy, self.phase, self.last_sounded) {
            (AlertPolicy::EveryFrame, _, _) => true,
            (AlertPolicy::Cooldown(_), AlertPhase::Idle, _) => true,
            (AlertPolicy::Cooldown(_), _, None) => true,
            (AlertPolicy::Cooldown(gap), _, Some(last)) => now.duration_since(last) >= gap,
        };

        if !due {
            debug!("Alert sound suppressed: in cooldown");
            self.phase = AlertPhase::Cooldown;
            return AlertOutcome {
                active: true,
                sounded: false,
                delivery_failed: false,
            };
        }

        warn!("DROWSINESS ALERT (score {})", score);
        self.phase = AlertPhase::Alerting;
        self.last_sounded = Some(now);
        let delivery_failed = match self.trigger_alert() {
            Ok(()) => false,
            Err(e) => {
                warn!("Alert delivery failed: {}", e);
                true
            }
        };

        AlertOutcome {
            active: true,
            sounded: true,
            delivery_failed,
        }
    }

    pub fn phase(&self) -> AlertPhase {
        self.phase
    }

    /// Sounds requested so far
    pub fn sound_count(&self) -> u64 {
        self.sound_count
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CountingSink {
        plays: Rc<Cell<u32>>,
        fail: bool,
    }

    impl AlertSink for CountingSink {
        fn play(&mut self) -> Result<(), AlertDeliveryError> {
            self.plays.set(self.plays.get() + 1);
            if self.fail {
                Err(AlertDeliveryError::SoundMissing(PathBuf::from("alarm.wav")))
            } else {
                Ok(())
            }
        }
    }

    fn controller(cooldown_ms: Option<u64>) -> (AlertController<CountingSink>, Rc<Cell<u32>>) {
        let sink = CountingSink::default();
        let plays = sink.plays.clone();
        let config = AlertConfig {
            cooldown_ms,
            ..Default::default()
        };
        (AlertController::new(config, sink), plays)
    }

    #[test]
    fn test_threshold_is_strict() {
        let (controller, _) = controller(None);
        assert!(!controller.should_alert(0));
        assert!(!controller.should_alert(15));
        assert!(controller.should_alert(16));
    }

    #[test]
    fn test_every_frame_policy_sounds_each_frame() {
        let (mut controller, plays) = controller(None);

        assert!(!controller.on_frame(15).active);
        for score in 16..20 {
            let outcome = controller.on_frame(score);
            assert!(outcome.active && outcome.sounded);
        }
        assert_eq!(plays.get(), 4);
        assert_eq!(controller.sound_count(), 4);
        assert_eq!(controller.phase(), AlertPhase::Alerting);
    }

    #[test]
    fn test_cooldown_suppresses_repeats() {
        let (mut controller, plays) = controller(Some(1000));
        let t0 = Instant::now();

        assert!(controller.on_frame_at(16, t0).sounded);
        let held = controller.on_frame_at(17, t0 + Duration::from_millis(500));
        assert!(held.active && !held.sounded);
        assert_eq!(controller.phase(), AlertPhase::Cooldown);

        assert!(controller.on_frame_at(18, t0 + Duration::from_millis(1000)).sounded);
        assert_eq!(plays.get(), 2);
    }

    #[test]
    fn test_cooldown_resets_when_alert_clears() {
        let (mut controller, plays) = controller(Some(60_000));
        let t0 = Instant::now();

        controller.on_frame_at(16, t0);
        controller.on_frame_at(15, t0 + Duration::from_millis(10));
        assert_eq!(controller.phase(), AlertPhase::Idle);

        assert!(controller.on_frame_at(16, t0 + Duration::from_millis(20)).sounded);
        assert_eq!(plays.get(), 2);
    }

    #[test]
    fn test_delivery_failure_is_reported_not_fatal() {
        let sink = CountingSink {
            fail: true,
            ..Default::default()
        };
        let mut controller = AlertController::new(AlertConfig::default(), sink);

        let outcome = controller.on_frame(20);
        assert!(outcome.active && outcome.sounded && outcome.delivery_failed);
        assert!(controller.on_frame(21).active);
    }

    #[test]
    fn test_zero_cooldown_means_every_frame() {
        let config = AlertConfig {
            cooldown_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(config.policy(), AlertPolicy::EveryFrame);
    }

    proptest! {
        #[test]
        fn alert_predicate_is_monotonic(score in 0_u32..10_000) {
            let (controller, _) = controller(None);
            prop_assert_eq!(controller.should_alert(score), score > 15);
        }
    }
}

//! Monitor configuration
//!
//! Layered as: built-in defaults, then a TOML file, then environment
//! variables (`DROWSY__<SECTION>__<KEY>`, e.g. `DROWSY__DMS__EAR_THRESHOLD`).

use std::path::{Path, PathBuf};

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use storage::LogConfig;

use crate::MonitorError;

/// Config file looked up in the working directory when `DROWSY_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "drowsiness-monitor.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "DROWSY_CONFIG";

/// Prefix of per-key environment overrides
pub const ENV_PREFIX: &str = "DROWSY";

/// Frame source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory of frame images
    pub device: PathBuf,
    /// Stop after this many frames
    pub max_frames: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let camera = CameraConfig::default();
        Self {
            device: camera.device,
            max_frames: camera.max_frames,
        }
    }
}

impl From<&SourceConfig> for CameraConfig {
    fn from(source: &SourceConfig) -> Self {
        CameraConfig {
            device: source.device.clone(),
            max_frames: source.max_frames,
        }
    }
}

/// Landmark detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// JSON-lines landmark trace
    pub trace_path: PathBuf,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::from("landmarks.jsonl"),
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub source: SourceConfig,
    pub detector: DetectorConfig,
    pub dms: DmsConfig,
    pub alert: AlertConfig,
    pub log: LogConfig,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit tracing output as JSON
    pub log_json: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            detector: DetectorConfig::default(),
            dms: DmsConfig::default(),
            alert: AlertConfig::default(),
            log: LogConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl MonitorConfig {
    /// Load from `DROWSY_CONFIG` (required if set) or the default file
    /// (optional), then the environment
    pub fn load() -> Result<Self, MonitorError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_with(Some(Path::new(&path)), true, ENV_PREFIX),
            None => Self::load_with(Some(Path::new(DEFAULT_CONFIG_FILE)), false, ENV_PREFIX),
        }
    }

    pub fn load_with(
        file: Option<&Path>,
        file_required: bool,
        env_prefix: &str,
    ) -> Result<Self, MonitorError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(file_required),
            );
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: MonitorConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        self.dms
            .validate()
            .map_err(|e| MonitorError::Config(e.to_string()))
    }
}

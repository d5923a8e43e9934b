use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::infrastructure::classifier_factory::ColorStrategy;
use crate::shared::constants::{
    ARM_SETTLE_MS, CAMERA_PROBE_INDICES, CONFIDENCE_THRESHOLD, DEFAULT_BAUD_RATE,
    DEFAULT_CLASS_NAMES, DEFAULT_SERIAL_PORT, DEFAULT_TICK_INTERVAL_MS, FALLBACK_CLIP_NAME,
    FALLBACK_IMAGE_NAME, GRASP_Z, GRIP_HOLD_MS, HOVER_Z, TRACKER_MATCH_THRESHOLD,
    TRACKER_MAX_AGE, TRACKER_MIN_HITS, UNKNOWN_BIN_KEY,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device indices `[probe_start, probe_end)` tried on every backend.
    pub probe_start: u32,
    pub probe_end: u32,
    pub preferred_index: Option<u32>,
    pub fallback_clip: Option<PathBuf>,
    pub fallback_image: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            probe_start: CAMERA_PROBE_INDICES.start,
            probe_end: CAMERA_PROBE_INDICES.end,
            preferred_index: None,
            fallback_clip: Some(PathBuf::from(FALLBACK_CLIP_NAME)),
            fallback_image: Some(PathBuf::from(FALLBACK_IMAGE_NAME)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub port: String,
    pub baud_rate: u32,
    pub settle_ms: u64,
    pub grip_hold_ms: u64,
    pub hover_z: i32,
    pub grasp_z: i32,
    /// Skip opening the serial port and run in simulation mode.
    pub simulate: bool,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            settle_ms: ARM_SETTLE_MS,
            grip_hold_ms: GRIP_HOLD_MS,
            hover_z: HOVER_Z,
            grasp_z: GRASP_Z,
            simulate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: Option<PathBuf>,
    pub class_names: Vec<String>,
    pub confidence_threshold: f64,
    /// Lowest score the model adapter reports; candidates between this and
    /// `confidence_threshold` are surfaced as unrecognized objects.
    pub candidate_threshold: f64,
    pub input_size: Option<u32>,
    /// Where labeled crops are stored for retraining.
    pub dataset_dir: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            class_names: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            confidence_threshold: CONFIDENCE_THRESHOLD,
            candidate_threshold: 0.25,
            input_size: None,
            dataset_dir: Some(PathBuf::from("dataset")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub max_age: usize,
    pub min_hits: usize,
    pub match_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: TRACKER_MAX_AGE,
            min_hits: TRACKER_MIN_HITS,
            match_threshold: TRACKER_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColorConfig {
    pub strategy: ColorStrategy,
}

/// Startup configuration for the whole sorting line.
///
/// Read once at startup; nothing in the pipeline mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    pub camera: CameraConfig,
    pub arm: ArmConfig,
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub color: ColorConfig,
    /// `"{class}_{color}"` → `[x, y]`; must contain `"unknown"`.
    pub bins: BTreeMap<String, [i32; 2]>,
    pub tick_interval_ms: u64,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            arm: ArmConfig::default(),
            detector: DetectorConfig::default(),
            tracker: TrackerConfig::default(),
            color: ColorConfig::default(),
            bins: default_bins(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// The shipped bin table: eight PET bins, eight HDPE bins and the
/// catch-all, spaced 50 units apart along the drop rail.
pub fn default_bins() -> BTreeMap<String, [i32; 2]> {
    const COLORS: [&str; 8] = [
        "clear", "blue", "green", "white", "black", "orange", "purple", "brown",
    ];
    let mut bins = BTreeMap::new();
    for (m, material) in ["PET", "HDPE"].iter().enumerate() {
        for (c, color) in COLORS.iter().enumerate() {
            let x = 100 + 400 * m as i32 + 50 * c as i32;
            bins.insert(format!("{material}_{color}"), [x, 200]);
        }
    }
    bins.insert(UNKNOWN_BIN_KEY.to_string(), [900, 200]);
    bins
}

impl SorterConfig {
    /// `<config dir>/Sortline/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Sortline").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SorterConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads an explicit path, or the default location if it exists.
    ///
    /// A missing file at the default location yields defaults; an explicit
    /// path must exist.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bins.contains_key(UNKNOWN_BIN_KEY) {
            return Err(ConfigError::Invalid(format!(
                "bins must contain a \"{UNKNOWN_BIN_KEY}\" fallback entry"
            )));
        }
        let threshold = self.detector.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }
        if self.tracker.min_hits == 0 {
            return Err(ConfigError::Invalid("tracker min_hits must be >= 1".into()));
        }
        if self.camera.probe_start > self.camera.probe_end {
            return Err(ConfigError::Invalid(format!(
                "camera probe range {}..{} is inverted",
                self.camera.probe_start, self.camera.probe_end
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick interval must be positive".into()));
        }
        Ok(())
    }
}

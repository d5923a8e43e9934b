use std::ops::Range;

/// Detections below this confidence never reach the tracker.
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Ticks a confirmed track may go unmatched before eviction.
pub const TRACKER_MAX_AGE: usize = 30;
/// Consecutive matches before a track is confirmed.
pub const TRACKER_MIN_HITS: usize = 3;
pub const TRACKER_MATCH_THRESHOLD: f64 = 0.3;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

pub const CAMERA_PROBE_INDICES: Range<u32> = 0..10;
pub const FALLBACK_CLIP_NAME: &str = "test_video.mp4";
pub const FALLBACK_IMAGE_NAME: &str = "test_image.jpg";

pub const ARM_SETTLE_MS: u64 = 1000;
pub const GRIP_HOLD_MS: u64 = 500;
pub const HOVER_Z: i32 = 0;
pub const GRASP_Z: i32 = -10;
pub const DEFAULT_BAUD_RATE: u32 = 9600;

#[cfg(target_os = "windows")]
pub const DEFAULT_SERIAL_PORT: &str = "COM3";
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";

pub const UNKNOWN_BIN_KEY: &str = "unknown";

pub const MATERIAL_MODEL_NAME: &str = "material_yolo.onnx";
pub const DEFAULT_CLASS_NAMES: &[&str] = &["PET", "HDPE", "PP", "PVC", "LDPE", "LDPE plastic bag"];

pub const LABELS_FILE_NAME: &str = "labels.txt";
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

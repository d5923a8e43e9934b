use crate::shared::frame::Frame;

use super::detection::Detection;

/// Domain interface for material detection.
///
/// Implementations may hold inference sessions or other mutable state,
/// hence `&mut self`. Confidence filtering is left to the caller.
pub trait MaterialDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Stores a user-labeled crop of an unrecognized object for later
    /// retraining. Optional capability.
    fn capture_label(
        &mut self,
        _region: &Frame,
        _label: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Err("label capture is not supported by this detector".into())
    }

    fn supports_label_capture(&self) -> bool {
        false
    }
}

use std::fmt;

use super::frame_grabber::FrameGrabber;

/// A device found during discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub backend: String,
    pub index: u32,
    pub label: String,
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A platform capture API that can open numbered devices.
pub trait CaptureBackend: Send {
    fn name(&self) -> &str;

    /// Opens device `index` and closes it again; true when it opened.
    fn probe(&self, index: u32) -> bool;

    fn open(&self, index: u32) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>>;

    fn describe(&self, index: u32) -> BackendDescriptor {
        BackendDescriptor {
            backend: self.name().to_string(),
            index,
            label: format!("Camera {index} ({})", self.name()),
        }
    }
}

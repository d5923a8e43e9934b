use super::frame_grabber::FrameGrabber;

/// Pre-recorded media used when no live camera opens.
pub trait FallbackOpener: Send {
    /// A finite clip that the frame source loops by rewinding.
    fn open_clip(&self) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>>;

    /// A single image repeated indefinitely.
    fn open_image(&self) -> Result<Box<dyn FrameGrabber>, Box<dyn std::error::Error>>;
}

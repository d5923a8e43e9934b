use crate::shared::frame::Frame;

/// An opened frame producer: a camera handle, a decoded clip or a still.
pub trait FrameGrabber: Send {
    /// Next frame, or `None` on an empty read / end of stream.
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Seeks back to the first frame. Only finite media support this.
    fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Err("this source cannot rewind".into())
    }

    /// Closes the underlying handle. Must tolerate repeated calls.
    fn release(&mut self) {}
}

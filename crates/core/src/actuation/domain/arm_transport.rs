/// Line-oriented link to the arm firmware.
///
/// Implementations write one complete command line per call; the caller
/// owns pacing between commands.
pub trait ArmTransport: Send {
    fn send_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error>>;

    /// Releases the underlying link. Must tolerate repeated calls.
    fn close(&mut self) {}
}

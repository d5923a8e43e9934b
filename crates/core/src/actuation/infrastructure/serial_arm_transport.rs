use std::io::Write;
use std::time::Duration;

use crate::actuation::domain::arm_transport::ArmTransport;

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Arm link over a serial port, 8N1 at the configured baud rate.
pub struct SerialArmTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    path: String,
}

impl SerialArmTransport {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, Box<dyn std::error::Error>> {
        let port = serialport::new(path, baud_rate)
            .timeout(WRITE_TIMEOUT)
            .open()?;
        log::info!("Opened arm serial port {path} at {baud_rate} baud");
        Ok(Self {
            port: Some(port),
            path: path.to_string(),
        })
    }
}

impl ArmTransport for SerialArmTransport {
    fn send_line(&mut self, line: &str) -> Result<(), Box<dyn std::error::Error>> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| format!("serial port {} is closed", self.path))?;
        port.write_all(line.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::info!("Closed arm serial port {}", self.path);
        }
    }
}

impl Drop for SerialArmTransport {
    fn drop(&mut self) {
        self.close();
    }
}

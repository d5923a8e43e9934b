use std::fmt;

use crate::shared::connection_state::ConnectionState;

use super::run_state::RunState;

/// Snapshot of the indicators shown to the operator.
#[derive(Clone, Debug, PartialEq)]
pub struct SorterStatus {
    pub run_state: RunState,
    pub camera: String,
    pub arm: String,
    pub status: String,
    pub troubleshooting: String,
}

impl fmt::Display for SorterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.camera)?;
        writeln!(f, "{}", self.arm)?;
        writeln!(f, "{}", self.status)?;
        write!(f, "Troubleshooting: {}", self.troubleshooting)
    }
}

pub fn camera_text(camera: Result<ConnectionState, &str>) -> String {
    match camera {
        Ok(ConnectionState::Connected) => "Camera: Connected".to_string(),
        Ok(ConnectionState::Disconnected) => "Camera: Not Connected (Using Fallback)".to_string(),
        Err(reason) => format!("Camera: Failed to Initialize ({reason})"),
    }
}

pub fn arm_text(arm: ConnectionState) -> String {
    match arm {
        ConnectionState::Connected => "Arm: Connected".to_string(),
        ConnectionState::Disconnected => "Arm: Not Connected (Simulation Mode)".to_string(),
    }
}

pub const STATUS_IDLE: &str = "Status: Idle";
pub const STATUS_RUNNING: &str = "Status: Running";
pub const STATUS_NO_FRAME: &str = "Status: No Frame Available";
pub const STATUS_CAMERA_NOT_INITIALIZED: &str = "Status: Camera Not Initialized";
pub const STATUS_DETECTOR_NOT_INITIALIZED: &str = "Status: Error - Detector Not Initialized";
pub const STATUS_STOPPED: &str = "Status: Stopped";

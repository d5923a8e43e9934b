use thiserror::Error;

use crate::actuation::domain::gripper_state::GripperState;

/// Non-fatal conditions raised while sorting, plus startup configuration
/// problems. Everything except `Config` is recovered at tick granularity.
#[derive(Error, Debug)]
pub enum SortingError {
    #[error("hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("detection failed: {0}")]
    DetectionFailure(String),
    #[error("tracking failed: {0}")]
    TrackingFailure(String),
    #[error("empty region for track {track_id}")]
    EmptyRegion { track_id: u32 },
    #[error("actuation failed during {step}: {reason} (gripper {gripper})")]
    FailedActuation {
        step: String,
        reason: String,
        gripper: GripperState,
    },
    #[error("cannot {action} while {state}")]
    InvalidTransition { action: String, state: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SortingError {
    /// Only configuration errors may abort initialization.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SortingError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_actuation_message_names_step_and_gripper() {
        let err = SortingError::FailedActuation {
            step: "descend to bin".to_string(),
            reason: "port closed".to_string(),
            gripper: GripperState::Open,
        };
        assert_eq!(
            err.to_string(),
            "actuation failed during descend to bin: port closed (gripper open)"
        );
    }

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(SortingError::Config("x".into()).is_fatal());
        assert!(!SortingError::HardwareUnavailable("x".into()).is_fatal());
        assert!(!SortingError::TrackingFailure("x".into()).is_fatal());
        assert!(!SortingError::EmptyRegion { track_id: 1 }.is_fatal());
    }
}

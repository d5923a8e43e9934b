use std::fmt;

/// Last gripper position the controller successfully commanded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GripperState {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for GripperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GripperState::Open => write!(f, "open"),
            GripperState::Closed => write!(f, "closed"),
        }
    }
}

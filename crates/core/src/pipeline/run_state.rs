use std::fmt;

/// Lifecycle of the sorting line. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RunState {
    /// Display-only passthrough.
    #[default]
    Idle,
    Sorting,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Sorting => write!(f, "sorting"),
            RunState::Stopped => write!(f, "stopped"),
        }
    }
}

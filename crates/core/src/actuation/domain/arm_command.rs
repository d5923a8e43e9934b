use std::fmt;

/// A single instruction understood by the arm firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmCommand {
    Move { x: i32, y: i32, z: i32 },
    Grip { close: bool },
}

impl ArmCommand {
    /// Wire form, newline terminated.
    pub fn to_line(&self) -> String {
        match self {
            ArmCommand::Move { x, y, z } => format!("MOVE {x} {y} {z}\n"),
            ArmCommand::Grip { close } => format!("GRIP {}\n", u8::from(*close)),
        }
    }
}

impl fmt::Display for ArmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_line().trim_end())
    }
}

use crossbeam_channel::Sender;

use crate::capture::domain::capture_backend::BackendDescriptor;

use super::sorter_status::SorterStatus;

/// Operator requests delivered to the sorting loop between ticks.
#[derive(Debug)]
pub enum ControlCommand {
    Start,
    Stop,
    Shutdown,
    /// Position in the discovered camera list.
    SelectCamera(usize),
    Jog { x: i32, y: i32, z: i32 },
    /// Label the pending unrecognized object.
    CaptureLabel(String),
    Status(Sender<SorterStatus>),
    Cameras(Sender<Vec<BackendDescriptor>>),
}

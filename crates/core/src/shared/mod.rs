pub mod bounding_box;
pub mod config;
pub mod connection_state;
pub mod constants;
pub mod error;
pub mod frame;

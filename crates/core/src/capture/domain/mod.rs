pub mod capture_backend;
pub mod fallback_opener;
pub mod frame_grabber;

pub mod domain;
pub mod identity_tracker;
pub mod infrastructure;

pub mod actuator_controller;
pub mod domain;
pub mod infrastructure;

pub mod arm_command;
pub mod arm_transport;
pub mod gripper_state;

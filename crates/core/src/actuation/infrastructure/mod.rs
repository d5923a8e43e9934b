pub mod serial_arm_transport;

pub mod control_command;
pub mod display_overlay;
pub mod infrastructure;
pub mod pipeline_logger;
pub mod run_state;
pub mod sorter_status;
pub mod sorting_orchestrator;

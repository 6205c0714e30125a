pub mod config_cmd;
pub mod process;
pub mod wiring;
pub mod worker;

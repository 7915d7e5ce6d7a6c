pub mod heartbeat;
pub mod merge;
pub mod orchestrator;
pub mod save;

//! Application layer - the update loop and CLI use cases

pub mod commands;
pub mod orchestrator;

pub use commands::{Cli, CommandExecutor, Commands};
pub use orchestrator::{BackfillReport, CycleReport, LevelView, UpdateOrchestrator};

//! Levelwatch - support-level proximity alerts for on-chain token pools
//! Layered as domain / infrastructure / application over a shared kernel

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::{CycleReport, UpdateOrchestrator};
pub use domain::alerts::AlertEvaluator;
pub use domain::bars::BarStore;
pub use domain::levels::LevelDetector;

//! Shared kernel - config, errors, common types and helpers

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;
pub mod utils;

pub use config::AppConfig;
pub use errors::AppError;
pub use types::{AlertKey, AlertRecord, Bar, SupportLevel, TokenInfo, TokenKey, TrackedToken};

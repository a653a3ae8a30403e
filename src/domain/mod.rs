//! Domain layer - bar history, support levels and alerting

pub mod alerts;
pub mod bars;
pub mod levels;
pub mod price;

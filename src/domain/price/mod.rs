//! Price domain - analytics over persisted bar history

mod price_analyzer;

pub use price_analyzer::{Drawdown, PriceAnalyzer, LAUNCH_SKIP_SECS};

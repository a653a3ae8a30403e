//! Alerts domain - proximity evaluation, cooldown state and message rendering

mod alert_evaluator;
mod alert_state;
mod message;

pub use alert_evaluator::{AlertEvaluator, AlertState};
pub use alert_state::{AlertStateStore, Clock, InMemoryAlertStateStore, ManualClock, SystemClock};
pub use message::{market_cap, MessageFormatter};

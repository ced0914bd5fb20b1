//! Alerting System
//!
//! Composes spoken hazard warnings and throttles them with a global cooldown.

mod message;
mod throttle;

pub use message::compose;
pub use throttle::{AlertConfig, AlertState, AlertThrottle};

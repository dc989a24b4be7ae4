//! Shared utilities for the forge genesis generator.

pub mod logging;
pub mod stats;
pub mod time;

pub use logging::{init_json_tracing, init_tracing};
pub use stats::ActionTally;
pub use time::{format_duration, format_timestamp};

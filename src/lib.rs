//! Payment-expiry countdown
//!
//! Parses order timeout expressions (`15m`, `2h`, `1d`), formats remaining
//! time for display and drives a once-per-second countdown that reports each
//! tick and the final expiry through callbacks.

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod expression;
pub mod format;
pub mod timer;

// Re-exports for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CountdownError, ExpressionError};
pub use expression::{parse_timeout_express, TimeoutExpress};
pub use format::format_remaining;
pub use timer::{CountdownTimer, StopHandle, TickOutcome};

//! Shared building blocks for the kintai service: configuration, the error
//! taxonomy every subsystem maps into, a clock abstraction, and the health
//! payload returned by the liveness endpoint.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FaultKind, KintaiError, Result};

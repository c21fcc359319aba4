//! Observability
//!
//! Structured JSON logging for the construction engine.
//!
//! # Principles
//!
//! 1. Observability is read-only: disabling logging never changes engine
//!    behavior.
//! 2. One log line = one event.
//! 3. Synchronous, no buffering, no background threads.
//! 4. Deterministic key ordering.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

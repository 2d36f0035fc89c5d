//! Observability for the broker
//!
//! Structured JSON logging of lifecycle events: one line per event,
//! explicit severities, deterministic key ordering, synchronous writes.

mod logger;

pub use logger::{Logger, Severity};

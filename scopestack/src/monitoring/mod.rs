//! Monitoring and observability infrastructure for scopestack.
//!
//! Structured log rendering for lifecycle events and leak detection for
//! handles that were acquired but never released.

pub mod leaks;
pub mod logging;

pub use leaks::{OpenHandle, ResourceLeakDetector, ResourceLeakStats};
pub use logging::{LogEntry, LogLevel, StructuredLogger};

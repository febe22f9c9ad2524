//! Structured logging setup for binaries embedding the detector.

mod format;

pub use format::{LogEvent, StructuredLogger};

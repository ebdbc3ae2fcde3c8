//! Structured logging with configurable formats.

mod tracing_init;

pub use tracing_init::*;

//! Shared utilities: telemetry setup and time sources.

pub mod clock;
pub mod telemetry;

pub use clock::*;
pub use telemetry::*;

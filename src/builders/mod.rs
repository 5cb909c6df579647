//! Builders to construct task schedulers from configuration.

pub mod scheduler_builder;

pub use scheduler_builder::{default_exception_handler, TaskSchedulerBuilder};

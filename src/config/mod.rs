//! Configuration models for schedulers and the wiring model.

pub mod model;
pub mod scheduler;

pub use model::ModelConfig;
pub use scheduler::{
    validate_name, SchedulerSettings, TaskSchedulerConfig, TaskSchedulerType,
    UnhandledTaskCapacity, DEFAULT_SLEEP_MICROS,
};

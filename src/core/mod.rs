//! Core scheduling abstractions and unhandled-task accounting.

pub mod busy_timer;
pub mod counter;
pub mod error;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod task;
pub mod wire;

pub use busy_timer::BusyTimer;
pub use counter::{
    BackpressureObjectCounter, MultiObjectCounter, NoOpObjectCounter, ObjectCounter,
    StandardObjectCounter,
};
pub use error::{AppResult, ExceptionHandler, SchedulerError, TaskFailure};
pub use metrics::{
    GaugeSampler, InMemoryMetricsRegistry, MetricSample, MetricsRegistry, NoOpMetricsRegistry,
};
pub use model::WiringModel;
pub(crate) use scheduler::SchedulerCore;
pub use scheduler::{SchedulerHandle, TaskScheduler};
pub use task::Task;
pub use wire::{InputWire, OutputWire, SolderType};

//! # Prometheus Task Wiring
//!
//! In-process task scheduling with backpressure for component pipelines.
//!
//! Components hand work to each other through named task schedulers. Each
//! scheduler accepts tasks, runs them under one of five execution strategies
//! and keeps an exact count of tasks accepted but not yet handled, so that no
//! stage of a pipeline can build an unbounded backlog.
//!
//! ## Core Problem Solved
//!
//! - **Bounded backlogs**: a scheduler with a capacity blocks (`put`) or
//!   rejects (`offer`) new work until earlier tasks have been handled
//! - **Exactly-once accounting**: every accepted task is released once, whether
//!   its handler succeeded, failed, panicked or was squelched
//! - **Shared capacity domains**: one counter can be on-ramped where work enters
//!   a pipeline and off-ramped where it leaves
//! - **Failure isolation**: handler failures go to an exception handler and never
//!   reach the inserting thread
//!
//! ## Execution strategies
//!
//! | Type | Runs on | Order | Busy-fraction metric |
//! |---|---|---|---|
//! | `CONCURRENT` | shared pool, in parallel | none | no |
//! | `SEQUENTIAL` | shared pool, one at a time | FIFO | yes |
//! | `SEQUENTIAL_THREAD` | dedicated thread | FIFO | yes |
//! | `DIRECT` | inserting thread | caller order | yes |
//! | `DIRECT_THREADSAFE` | inserting thread, mutually exclusive | contention order | yes |
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_task_wiring::config::{ModelConfig, TaskSchedulerType};
//! use prometheus_task_wiring::core::{SolderType, WiringModel};
//!
//! let model = WiringModel::new(ModelConfig::default())?;
//!
//! let parse = model
//!     .scheduler_builder("parse")
//!     .with_type(TaskSchedulerType::Sequential)
//!     .with_unhandled_task_capacity(500)
//!     .with_flushing_enabled(true)
//!     .build::<Record>()?;
//! let store = model
//!     .scheduler_builder("store")
//!     .with_type(TaskSchedulerType::SequentialThread)
//!     .with_flushing_enabled(true)
//!     .build::<()>()?;
//!
//! let lines = parse.build_input_wire("lines", |line: String| Record::parse(&line));
//! let records = store.build_input_wire("records", |record: Record| db.insert(record));
//! parse.output_wire().solder_to(&records, SolderType::Put);
//!
//! for line in input {
//!     lines.put(line);
//! }
//! parse.flush()?;
//! store.flush()?;
//! model.stop();
//! ```
//!
//! For complete examples, see:
//! - `tests/scheduler_test.rs` - per-strategy behaviour
//! - `tests/backpressure_pipeline_test.rs` - shared capacity across stages

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and unhandled-task accounting.
pub mod core;
/// Configuration models for schedulers and the wiring model.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Execution pools schedulers run on.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use builders::TaskSchedulerBuilder;
pub use config::{ModelConfig, SchedulerSettings, TaskSchedulerConfig, TaskSchedulerType};
pub use crate::core::{
    ObjectCounter, SchedulerError, SolderType, Task, TaskFailure, TaskScheduler, WiringModel,
};

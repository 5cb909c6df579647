//! Error types for scheduler operations.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced while building or operating task schedulers.
///
/// Every variant is either a configuration error (raised by a builder before
/// the scheduler is registered) or a usage error (raised by a runtime call the
/// scheduler was not configured to support).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Scheduler name is empty or contains characters other than `[A-Za-z0-9_]`.
    #[error("invalid scheduler name `{0}`: only ASCII letters, digits and underscores are allowed")]
    InvalidName(String),
    /// A scheduler with this name is already registered in the model.
    #[error("scheduler `{0}` is already registered")]
    DuplicateName(String),
    /// Statically detectable incompatible configuration.
    #[error("invalid configuration for `{name}`: {reason}")]
    InvalidConfig {
        /// Scheduler name.
        name: String,
        /// What is wrong with the configuration.
        reason: String,
    },
    /// `flush` was called on a scheduler built without flushing.
    #[error("scheduler `{0}` does not support flushing")]
    FlushUnsupported(String),
    /// `set_squelched` was called on a scheduler built without squelching.
    #[error("scheduler `{0}` does not support squelching")]
    SquelchUnsupported(String),
    /// A metric with this name already exists in the registry.
    #[error("metric `{0}` is already registered")]
    DuplicateMetric(String),
    /// A dedicated thread could not be spawned.
    #[error("failed to spawn thread `{name}`: {reason}")]
    ThreadSpawn {
        /// Thread name.
        name: String,
        /// OS error message.
        reason: String,
    },
    /// The execution pool has been shut down.
    #[error("pool `{0}` has been shut down")]
    PoolShutdown(String),
    /// Configuration text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// A failure raised while executing a task handler.
///
/// Task failures never propagate to the thread that inserted the task; they are
/// delivered exactly once to the scheduler's [`ExceptionHandler`].
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// Handler returned an error.
    #[error("handler returned an error: {0:#}")]
    Failed(anyhow::Error),
    /// Handler panicked; carries the panic message.
    #[error("handler panicked: {0}")]
    Panicked(String),
    /// Task was accepted but could not be handed to an execution thread.
    #[error("task rejected: {0}")]
    Rejected(String),
}

/// Callback receiving the scheduler name and each uncaught task failure.
pub type ExceptionHandler = Arc<dyn Fn(&str, &TaskFailure) + Send + Sync>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

//! Task schedulers.
//!
//! A [`TaskScheduler`] accepts tasks through `put`, `offer` or `inject`,
//! records them on its on-ramp counter, runs them with one of five execution
//! strategies and records them on its off-ramp counter once the handler is
//! done, whether it succeeded, failed or was squelched.
//!
//! | Type | Runs on | Order |
//! |---|---|---|
//! | `CONCURRENT` | shared pool, in parallel | none |
//! | `SEQUENTIAL` | shared pool, one at a time | FIFO |
//! | `SEQUENTIAL_THREAD` | dedicated thread | FIFO |
//! | `DIRECT` | inserting thread | caller order |
//! | `DIRECT_THREADSAFE` | inserting thread, mutually exclusive | contention order |

mod concurrent;
mod direct;
mod sequential;
mod sequential_thread;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use self::concurrent::ConcurrentStrategy;
use self::direct::DirectThreadsafeStrategy;
use self::sequential::SequentialStrategy;
use self::sequential_thread::SequentialThreadStrategy;
use super::{
    BusyTimer, ExceptionHandler, InputWire, ObjectCounter, OutputWire, SchedulerError, Task,
    TaskFailure,
};
use crate::config::TaskSchedulerType;
use crate::runtime::TaskPool;

/// Object-safe view of a scheduler, independent of its output type.
///
/// The model keeps registered schedulers behind this trait.
pub trait SchedulerHandle: Send + Sync {
    /// Unique scheduler name.
    fn name(&self) -> &str;
    /// Execution strategy.
    fn scheduler_type(&self) -> TaskSchedulerType;
    /// Whether [`flush`](Self::flush) is supported.
    fn is_flushable(&self) -> bool;
    /// Block until every accepted task has been handled.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::FlushUnsupported`] unless built with flushing enabled.
    fn flush(&self) -> Result<(), SchedulerError>;
    /// Tasks accepted but not yet handled; 0 when the scheduler does not count.
    fn unprocessed_task_count(&self) -> u64;
    /// Stop owned threads after they drain; no effect for pool or inline schedulers.
    fn stop(&self);
}

/// State shared by every strategy: accounting, failure reporting and output.
pub(crate) struct SchedulerCore<O> {
    pub(crate) name: String,
    pub(crate) scheduler_type: TaskSchedulerType,
    pub(crate) on_ramp: Arc<dyn ObjectCounter>,
    pub(crate) off_ramp: Arc<dyn ObjectCounter>,
    /// The scheduler's own counter, absent when nothing needs the count.
    pub(crate) internal: Option<Arc<dyn ObjectCounter>>,
    pub(crate) busy_timer: Option<Arc<BusyTimer>>,
    pub(crate) exception_handler: ExceptionHandler,
    pub(crate) flushing_enabled: bool,
    pub(crate) squelching_enabled: bool,
    pub(crate) squelched: AtomicBool,
    pub(crate) blocking_insertion: bool,
    pub(crate) output: OutputWire<O>,
}

impl<O: Clone + Send + 'static> SchedulerCore<O> {
    /// Run a dequeued task and release it.
    pub(crate) fn execute(&self, task: Task<O>) {
        if self.squelched.load(Ordering::Acquire) {
            drop(task);
        } else {
            self.run_handler(task);
        }
        self.off_ramp.off_ramp();
    }

    /// Release a task that was accepted but can no longer be run.
    pub(crate) fn reject(&self, reason: &SchedulerError) {
        warn!(scheduler = %self.name, reason = %reason, "accepted task could not be scheduled");
        self.report(&TaskFailure::Rejected(reason.to_string()));
        self.off_ramp.off_ramp();
    }

    fn run_handler(&self, task: Task<O>) {
        if let Some(timer) = &self.busy_timer {
            timer.activate();
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            task.run().map(|value| self.output.forward(value))
        }));
        if let Some(timer) = &self.busy_timer {
            timer.deactivate();
        }

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => TaskFailure::Failed(e),
            Err(payload) => TaskFailure::Panicked(panic_message(payload.as_ref())),
        };
        self.report(&failure);
    }

    fn report(&self, failure: &TaskFailure) {
        let handler = &self.exception_handler;
        if panic::catch_unwind(AssertUnwindSafe(|| handler(&self.name, failure))).is_err() {
            error!(scheduler = %self.name, failure = %failure, "uncaught exception handler panicked");
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

enum Strategy<O> {
    Concurrent(ConcurrentStrategy),
    Sequential(Arc<SequentialStrategy<O>>),
    SequentialThread(SequentialThreadStrategy<O>),
    Direct,
    DirectThreadsafe(DirectThreadsafeStrategy),
}

impl<O: Clone + Send + 'static> Strategy<O> {
    fn new(core: &Arc<SchedulerCore<O>>, pool: Arc<dyn TaskPool>) -> Result<Self, SchedulerError> {
        Ok(match core.scheduler_type {
            TaskSchedulerType::Concurrent => Self::Concurrent(ConcurrentStrategy::new(pool)),
            TaskSchedulerType::Sequential => {
                Self::Sequential(Arc::new(SequentialStrategy::new(Arc::clone(core), pool)))
            }
            TaskSchedulerType::SequentialThread => {
                Self::SequentialThread(SequentialThreadStrategy::spawn(Arc::clone(core))?)
            }
            TaskSchedulerType::Direct => Self::Direct,
            TaskSchedulerType::DirectThreadsafe => {
                Self::DirectThreadsafe(DirectThreadsafeStrategy::default())
            }
        })
    }

    fn dispatch(&self, core: &Arc<SchedulerCore<O>>, task: Task<O>) {
        match self {
            Self::Concurrent(strategy) => strategy.dispatch(core, task),
            Self::Sequential(strategy) => strategy.dispatch(task),
            Self::SequentialThread(strategy) => strategy.dispatch(task),
            Self::Direct => core.execute(task),
            Self::DirectThreadsafe(strategy) => strategy.dispatch(core, task),
        }
    }

    fn stop(&self) {
        if let Self::SequentialThread(strategy) = self {
            strategy.stop();
        }
    }
}

struct SchedulerInner<O> {
    core: Arc<SchedulerCore<O>>,
    strategy: Strategy<O>,
}

impl<O: Clone + Send + 'static> SchedulerHandle for SchedulerInner<O> {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn scheduler_type(&self) -> TaskSchedulerType {
        self.core.scheduler_type
    }

    fn is_flushable(&self) -> bool {
        self.core.flushing_enabled
    }

    fn flush(&self) -> Result<(), SchedulerError> {
        match (&self.core.internal, self.core.flushing_enabled) {
            (Some(counter), true) => {
                counter.wait_until_empty();
                Ok(())
            }
            _ => Err(SchedulerError::FlushUnsupported(self.core.name.clone())),
        }
    }

    fn unprocessed_task_count(&self) -> u64 {
        self.core.internal.as_ref().map_or(0, |counter| counter.count())
    }

    fn stop(&self) {
        self.strategy.stop();
    }
}

/// A named scheduler producing values of type `O`.
///
/// Cheap to clone; clones share the same scheduler. Built through
/// [`WiringModel::scheduler_builder`](super::WiringModel::scheduler_builder).
pub struct TaskScheduler<O> {
    inner: Arc<SchedulerInner<O>>,
}

impl<O> Clone for TaskScheduler<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O> fmt::Debug for TaskScheduler<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = &self.inner.core;
        f.debug_struct("TaskScheduler")
            .field("name", &core.name)
            .field("type", &core.scheduler_type)
            .field("squelched", &core.squelched.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<O> TaskScheduler<O> {
    /// Unique scheduler name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.core.name
    }

    /// Execution strategy.
    #[must_use]
    pub fn scheduler_type(&self) -> TaskSchedulerType {
        self.inner.core.scheduler_type
    }

    /// Whether `put` waits for capacity.
    #[must_use]
    pub fn is_insertion_blocking(&self) -> bool {
        self.inner.core.blocking_insertion
    }

    /// Whether tasks are currently being squelched.
    #[must_use]
    pub fn is_squelched(&self) -> bool {
        self.inner.core.squelched.load(Ordering::Acquire)
    }

    /// Results of successful handlers.
    #[must_use]
    pub fn output_wire(&self) -> &OutputWire<O> {
        &self.inner.core.output
    }
}

impl<O: Clone + Send + 'static> TaskScheduler<O> {
    pub(crate) fn assemble(
        core: SchedulerCore<O>,
        pool: Arc<dyn TaskPool>,
    ) -> Result<Self, SchedulerError> {
        let core = Arc::new(core);
        let strategy = Strategy::new(&core, pool)?;
        Ok(Self {
            inner: Arc::new(SchedulerInner { core, strategy }),
        })
    }

    /// Insert a task, waiting for capacity when insertion is blocking.
    ///
    /// Never fails and never observes the task's outcome.
    pub fn put(&self, task: Task<O>) {
        let core = &self.inner.core;
        if core.blocking_insertion {
            core.on_ramp.on_ramp();
        } else {
            core.on_ramp.force_on_ramp();
        }
        self.inner.strategy.dispatch(core, task);
    }

    /// Insert a task if there is capacity. Never blocks.
    ///
    /// Returns `false` if the task was not accepted; it is dropped unrun.
    pub fn offer(&self, task: Task<O>) -> bool {
        let core = &self.inner.core;
        if !core.on_ramp.attempt_on_ramp() {
            return false;
        }
        self.inner.strategy.dispatch(core, task);
        true
    }

    /// Insert a task ignoring capacity. Never blocks.
    pub fn inject(&self, task: Task<O>) {
        let core = &self.inner.core;
        core.on_ramp.force_on_ramp();
        self.inner.strategy.dispatch(core, task);
    }

    /// Block until every accepted task has been handled.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::FlushUnsupported`] unless built with flushing enabled.
    pub fn flush(&self) -> Result<(), SchedulerError> {
        self.inner.flush()
    }

    /// Start or stop discarding tasks at dequeue time.
    ///
    /// Squelched tasks are still counted and released but their handlers are
    /// skipped. A handler already running is unaffected.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::SquelchUnsupported`] unless built with squelching enabled.
    pub fn set_squelched(&self, squelched: bool) -> Result<(), SchedulerError> {
        let core = &self.inner.core;
        if !core.squelching_enabled {
            return Err(SchedulerError::SquelchUnsupported(core.name.clone()));
        }
        if core.squelched.swap(squelched, Ordering::AcqRel) != squelched {
            info!(scheduler = %core.name, squelched, "squelch toggled");
        }
        Ok(())
    }

    /// Tasks accepted but not yet handled; 0 when the scheduler does not count.
    #[must_use]
    pub fn unprocessed_task_count(&self) -> u64 {
        self.inner.unprocessed_task_count()
    }

    /// Input wire running `handler` on this scheduler for each inserted value.
    pub fn build_input_wire<I, F>(&self, name: impl Into<String>, handler: F) -> InputWire<I, O>
    where
        I: Send + 'static,
        F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        InputWire::new(name, self.clone(), Arc::new(handler))
    }

    /// Type-erased handle for registries.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn SchedulerHandle> {
        Arc::clone(&self.inner) as Arc<dyn SchedulerHandle>
    }

    pub(crate) fn stop(&self) {
        self.inner.strategy.stop();
    }
}

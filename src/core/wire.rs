//! Wires: typed hand-off between schedulers.
//!
//! Each scheduler owns an [`OutputWire`] that receives every successful
//! handler result. An [`InputWire`] binds a handler to a scheduler; soldering
//! an output wire to an input wire turns each result into a new task
//! downstream.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::{Task, TaskScheduler};

type Consumer<O> = Arc<dyn Fn(O) + Send + Sync>;

/// How an output wire inserts values into a downstream input wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolderType {
    /// Blocking insertion; honours downstream backpressure.
    #[default]
    Put,
    /// Non-blocking insertion; values rejected by downstream are dropped.
    Offer,
    /// Forced insertion; ignores downstream capacity.
    Inject,
}

/// Fan-out of a scheduler's handler results.
pub struct OutputWire<O> {
    name: String,
    consumers: RwLock<Vec<Consumer<O>>>,
}

impl<O> OutputWire<O> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumers: RwLock::new(Vec::new()),
        }
    }

    /// Name of the owning scheduler.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of soldered consumers.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }
}

impl<O: Clone + Send + 'static> OutputWire<O> {
    /// Deliver every future result to `consumer`, after previously soldered ones.
    pub fn solder(&self, consumer: impl Fn(O) + Send + Sync + 'static) {
        self.consumers.write().push(Arc::new(consumer));
    }

    /// Feed every future result into `input` using `solder_type`.
    pub fn solder_to<X>(&self, input: &InputWire<O, X>, solder_type: SolderType)
    where
        X: Clone + Send + 'static,
    {
        let input = input.clone();
        let from = self.name.clone();
        self.solder(move |value| match solder_type {
            SolderType::Put => input.put(value),
            SolderType::Offer => {
                if !input.offer(value) {
                    trace!(from = %from, to = %input.name(), "offer rejected, value dropped");
                }
            }
            SolderType::Inject => input.inject(value),
        });
    }

    pub(crate) fn forward(&self, value: O) {
        // Snapshot so consumers may block or solder without holding the lock.
        let consumers = self.consumers.read().clone();
        if let Some((last, rest)) = consumers.split_last() {
            for consumer in rest {
                consumer(value.clone());
            }
            last(value);
        }
    }
}

impl<O> fmt::Debug for OutputWire<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputWire")
            .field("name", &self.name)
            .field("consumers", &self.consumer_count())
            .finish()
    }
}

/// Entry point into a scheduler for values of type `I`.
pub struct InputWire<I, O> {
    name: String,
    scheduler: TaskScheduler<O>,
    handler: Arc<dyn Fn(I) -> anyhow::Result<O> + Send + Sync>,
}

impl<I, O> Clone for InputWire<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            scheduler: self.scheduler.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<I, O> fmt::Debug for InputWire<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputWire")
            .field("name", &self.name)
            .field("scheduler", &self.scheduler.name())
            .finish_non_exhaustive()
    }
}

impl<I, O> InputWire<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    pub(crate) fn new(
        name: impl Into<String>,
        scheduler: TaskScheduler<O>,
        handler: Arc<dyn Fn(I) -> anyhow::Result<O> + Send + Sync>,
    ) -> Self {
        Self {
            name: name.into(),
            scheduler,
            handler,
        }
    }

    /// Wire name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scheduler this wire feeds.
    #[must_use]
    pub const fn scheduler(&self) -> &TaskScheduler<O> {
        &self.scheduler
    }

    fn task(&self, value: I) -> Task<O> {
        let handler = Arc::clone(&self.handler);
        Task::from_fn(move || handler(value))
    }

    /// Insert a value, blocking while the scheduler applies backpressure.
    pub fn put(&self, value: I) {
        self.scheduler.put(self.task(value));
    }

    /// Insert a value if the scheduler has room; returns whether it was accepted.
    pub fn offer(&self, value: I) -> bool {
        self.scheduler.offer(self.task(value))
    }

    /// Insert a value regardless of capacity.
    pub fn inject(&self, value: I) {
        self.scheduler.inject(self.task(value));
    }
}

//! Units of work.

use std::fmt;

/// A payload bound to the handler that will process it.
///
/// The scheduler owns a task from the moment it is accepted until its handler
/// returns. Tasks have no identity beyond their enqueue order.
pub struct Task<O> {
    body: Box<dyn FnOnce() -> anyhow::Result<O> + Send + 'static>,
}

impl<O> Task<O> {
    /// Bind `payload` to `handler`.
    pub fn new<I, F>(payload: I, handler: F) -> Self
    where
        I: Send + 'static,
        F: FnOnce(I) -> anyhow::Result<O> + Send + 'static,
    {
        Self {
            body: Box::new(move || handler(payload)),
        }
    }

    /// Task from a closure that already captures its payload.
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<O> + Send + 'static,
    {
        Self {
            body: Box::new(body),
        }
    }

    pub(crate) fn run(self) -> anyhow::Result<O> {
        (self.body)()
    }
}

impl<O> fmt::Debug for Task<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

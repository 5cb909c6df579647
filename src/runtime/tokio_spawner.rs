//! Tokio runtime spawner implementation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use super::{Job, TaskPool};
use crate::core::SchedulerError;

/// Pool adapter that runs scheduler jobs on a tokio runtime's blocking threads.
///
/// Handlers are synchronous and may block, so jobs go through
/// `spawn_blocking` rather than onto the async worker threads.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Arc<tokio::runtime::Handle>,
    shutdown: Arc<AtomicBool>,
}

impl TokioSpawner {
    /// Create a new `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TaskPool for TokioSpawner {
    fn execute(&self, job: Job) -> Result<(), SchedulerError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(SchedulerError::PoolShutdown("tokio".into()));
        }
        // Detached; the job reports its own outcome.
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }

    fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            info!("tokio spawner stopped accepting jobs");
        }
    }
}

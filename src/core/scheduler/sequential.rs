use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::SchedulerCore;
use crate::core::{SchedulerError, Task};
use crate::runtime::TaskPool;

/// One-at-a-time execution on a shared pool.
///
/// Tasks queue in a channel; `pending` counts queued tasks and at most one pool
/// job runs them, re-submitting itself after each task while work remains.
/// Whoever moves `pending` off zero schedules the job.
pub(super) struct SequentialStrategy<O> {
    core: Arc<SchedulerCore<O>>,
    pool: Arc<dyn TaskPool>,
    sender: Sender<Task<O>>,
    receiver: Receiver<Task<O>>,
    pending: AtomicUsize,
}

impl<O: Clone + Send + 'static> SequentialStrategy<O> {
    pub(super) fn new(core: Arc<SchedulerCore<O>>, pool: Arc<dyn TaskPool>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            core,
            pool,
            sender,
            receiver,
            pending: AtomicUsize::new(0),
        }
    }

    pub(super) fn dispatch(self: &Arc<Self>, task: Task<O>) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        if self.sender.send(task).is_err() {
            return;
        }
        if self.pending.fetch_add(1, Ordering::AcqRel) == 0 {
            self.schedule();
        }
    }

    fn schedule(self: &Arc<Self>) {
        let runner = Arc::clone(self);
        if let Err(e) = self.pool.execute(Box::new(move || runner.run_next())) {
            self.reject_pending(&e);
        }
    }

    fn run_next(self: &Arc<Self>) {
        if let Ok(task) = self.receiver.try_recv() {
            self.core.execute(task);
        }
        if self.pending.fetch_sub(1, Ordering::AcqRel) > 1 {
            self.schedule();
        }
    }

    /// The pool refused the runner job: release everything it would have run.
    fn reject_pending(&self, reason: &SchedulerError) {
        loop {
            if let Ok(task) = self.receiver.try_recv() {
                drop(task);
                self.core.reject(reason);
            }
            if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                break;
            }
        }
    }
}

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::SchedulerCore;
use crate::core::{SchedulerError, Task};

/// FIFO execution on a thread owned by the scheduler.
pub(super) struct SequentialThreadStrategy<O> {
    core: Arc<SchedulerCore<O>>,
    /// `None` once stopped.
    sender: Mutex<Option<Sender<Task<O>>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<O: Clone + Send + 'static> SequentialThreadStrategy<O> {
    pub(super) fn spawn(core: Arc<SchedulerCore<O>>) -> Result<Self, SchedulerError> {
        let (sender, receiver) = unbounded::<Task<O>>();
        let thread_name = format!("{}-thread", core.name);
        let worker_core = Arc::clone(&core);

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(scheduler = %worker_core.name, "scheduler thread started");
                // Ends once the sender is dropped and the queue is drained.
                while let Ok(task) = receiver.recv() {
                    worker_core.execute(task);
                }
                debug!(scheduler = %worker_core.name, "scheduler thread exiting");
            })
            .map_err(|e| SchedulerError::ThreadSpawn {
                name: thread_name,
                reason: e.to_string(),
            })?;

        Ok(Self {
            core,
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(handle)),
        })
    }

    pub(super) fn dispatch(&self, task: Task<O>) {
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            drop(task);
            self.core.reject(&SchedulerError::PoolShutdown(self.core.name.clone()));
            return;
        };
        if let Err(e) = sender.send(task) {
            drop(e.into_inner());
            self.core.reject(&SchedulerError::PoolShutdown(self.core.name.clone()));
        }
    }

    /// Stop accepting tasks and wait for the queue to drain.
    ///
    /// Does not wait when called from the scheduler's own thread.
    pub(super) fn stop(&self) {
        drop(self.sender.lock().take());
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!(scheduler = %self.core.name, "scheduler thread panicked");
        }
        info!(scheduler = %self.core.name, "scheduler thread stopped");
    }
}

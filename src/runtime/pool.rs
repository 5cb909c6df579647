//! Shared execution pools for CONCURRENT and SEQUENTIAL schedulers.
//!
//! [`WorkerThreadPool`] runs jobs on a fixed set of dedicated OS threads fed
//! by a `crossbeam-channel` queue.
//!
//! # Design Principles
//!
//! - **No polling on the hot path**: workers block on channel `recv`
//! - **Clean shutdown**: dropping the sender unblocks workers naturally
//! - **Managed blocking**: a worker about to block in a counter wait hands its
//!   slot to a temporary compensating worker (see [`managed_blocking`])

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ModelConfig;
use crate::core::SchedulerError;

/// A unit of work submitted to a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// How often a compensating worker checks whether its lease has ended.
const COMPENSATION_POLL: Duration = Duration::from_millis(1);

/// Compensating workers allowed per permanent worker.
const COMPENSATION_PER_WORKER: usize = 4;

/// Abstraction over the thread pool that runs pooled schedulers.
pub trait TaskPool: Send + Sync + fmt::Debug {
    /// Queue `job` for execution on some pool thread.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::PoolShutdown`] once the pool no longer accepts
    /// work; the job is dropped without running.
    fn execute(&self, job: Job) -> Result<(), SchedulerError>;

    /// Stop accepting work and release pool threads.
    fn shutdown(&self);
}

thread_local! {
    static CURRENT_POOL: RefCell<Option<Weak<PoolShared>>> = const { RefCell::new(None) };
}

/// State shared between the pool handle and its worker threads.
struct PoolShared {
    name: String,
    receiver: Receiver<Job>,
    next_worker_id: AtomicUsize,
    compensating: AtomicUsize,
    max_compensating: usize,
}

/// Fixed-size pool of dedicated OS threads.
pub struct WorkerThreadPool {
    shared: Arc<PoolShared>,
    /// Job sender. `None` after shutdown.
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: AtomicBool,
    worker_count: usize,
}

impl WorkerThreadPool {
    /// Spawn `worker_count` threads named `<name>-<id>`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for a zero worker count and
    /// [`SchedulerError::ThreadSpawn`] if a thread cannot be created.
    pub fn new(name: impl Into<String>, worker_count: usize) -> Result<Self, SchedulerError> {
        let name = name.into();
        if worker_count == 0 {
            return Err(SchedulerError::InvalidConfig {
                name,
                reason: "worker_count must be greater than 0".into(),
            });
        }

        let (sender, receiver) = unbounded::<Job>();
        let shared = Arc::new(PoolShared {
            name,
            receiver,
            next_worker_id: AtomicUsize::new(0),
            compensating: AtomicUsize::new(0),
            max_compensating: worker_count.saturating_mul(COMPENSATION_PER_WORKER),
        });

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            workers.push(spawn_worker(&shared, None)?);
        }

        info!(pool = %shared.name, worker_count, "worker pool started");

        Ok(Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shutdown: AtomicBool::new(false),
            worker_count,
        })
    }

    /// Build the pool described by a model configuration.
    ///
    /// # Errors
    ///
    /// See [`WorkerThreadPool::new`].
    pub fn from_config(config: &ModelConfig) -> Result<Self, SchedulerError> {
        Self::new(config.pool_thread_prefix.clone(), config.pool_threads)
    }

    /// Number of permanent worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of compensating workers currently covering blocked workers.
    #[must_use]
    pub fn compensating_workers(&self) -> usize {
        self.shared.compensating.load(Ordering::Acquire)
    }

    /// Upper bound on simultaneous compensating workers.
    #[must_use]
    pub fn compensation_limit(&self) -> usize {
        self.shared.max_compensating
    }
}

impl fmt::Debug for WorkerThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerThreadPool")
            .field("name", &self.shared.name)
            .field("worker_count", &self.worker_count)
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TaskPool for WorkerThreadPool {
    fn execute(&self, job: Job) -> Result<(), SchedulerError> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender
                .send(job)
                .map_err(|_| SchedulerError::PoolShutdown(self.shared.name.clone())),
            None => Err(SchedulerError::PoolShutdown(self.shared.name.clone())),
        }
    }

    fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(pool = %self.shared.name, "shutting down worker pool");

        // Dropping the sender lets workers drain the queue and then exit.
        self.sender.lock().take();

        let mut workers = self.workers.lock();
        let current = thread::current().id();
        for (idx, worker) in workers.drain(..).enumerate() {
            if worker.thread().id() == current {
                // Shutdown requested from a pool thread; it exits on its own.
                continue;
            }
            if worker.join().is_err() {
                warn!(pool = %self.shared.name, worker_id = idx, "worker panicked");
            }
        }

        info!(pool = %self.shared.name, "worker pool shut down complete");
    }
}

impl Drop for WorkerThreadPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join in Drop; explicit shutdown() joins.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.sender.lock().take();
            debug!(pool = %self.shared.name, "worker pool dropped without explicit shutdown");
        }
    }
}

/// Run `f`, which may block for a while, without starving the current pool.
///
/// On a [`WorkerThreadPool`] thread, a temporary compensating worker is spawned
/// for the duration of `f` so that queued jobs (including the ones that will
/// eventually unblock `f`) keep running. Elsewhere `f` simply runs.
///
/// At most [`compensation_limit`](WorkerThreadPool::compensation_limit)
/// compensating workers exist at once; past that, `f` blocks uncovered.
pub fn managed_blocking<R>(f: impl FnOnce() -> R) -> R {
    let shared = CURRENT_POOL.with(|current| current.borrow().as_ref().and_then(Weak::upgrade));
    let Some(shared) = shared else {
        return f();
    };

    let lease = Arc::new(AtomicBool::new(false));
    let reserved = shared
        .compensating
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            (n < shared.max_compensating).then_some(n + 1)
        })
        .is_ok();
    if !reserved {
        debug!(
            pool = %shared.name,
            limit = shared.max_compensating,
            "compensation limit reached, blocking without a compensating worker"
        );
    } else if let Err(e) = spawn_worker(&shared, Some(Arc::clone(&lease))) {
        shared.compensating.fetch_sub(1, Ordering::AcqRel);
        warn!(pool = %shared.name, error = %e, "failed to spawn compensating worker");
    }
    drop(shared);

    let result = f();
    lease.store(true, Ordering::Release);
    result
}

/// Spawn a worker thread; a `lease` makes it a compensating worker that exits
/// once the lease is released.
fn spawn_worker(
    shared: &Arc<PoolShared>,
    lease: Option<Arc<AtomicBool>>,
) -> Result<JoinHandle<()>, SchedulerError> {
    let worker_id = shared.next_worker_id.fetch_add(1, Ordering::Relaxed);
    let thread_name = format!("{}-{worker_id}", shared.name);
    let shared = Arc::clone(shared);

    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            CURRENT_POOL.with(|current| *current.borrow_mut() = Some(Arc::downgrade(&shared)));
            debug!(worker_id, compensating = lease.is_some(), "worker thread started");

            match lease {
                None => {
                    // Blocks until a job arrives; Err once the sender is dropped.
                    while let Ok(job) = shared.receiver.recv() {
                        run_job(&shared.name, worker_id, job);
                    }
                }
                Some(lease) => {
                    while !lease.load(Ordering::Acquire) {
                        match shared.receiver.recv_timeout(COMPENSATION_POLL) {
                            Ok(job) => run_job(&shared.name, worker_id, job),
                            Err(RecvTimeoutError::Timeout) => {}
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    shared.compensating.fetch_sub(1, Ordering::AcqRel);
                }
            }

            debug!(worker_id, "worker thread exiting");
        })
        .map_err(|e| SchedulerError::ThreadSpawn {
            name: thread_name,
            reason: e.to_string(),
        })
}

fn run_job(pool: &str, worker_id: usize, job: Job) {
    // Scheduler jobs catch handler panics themselves; this keeps the worker
    // alive if anything else slips through.
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        error!(pool, worker_id, "job panicked on pool worker");
    }
}

//! Runtime adapters: the execution pools pooled schedulers run on.

pub mod pool;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_spawner;

pub use pool::{managed_blocking, Job, TaskPool, WorkerThreadPool};
#[cfg(feature = "tokio-runtime")]
pub use tokio_spawner::TokioSpawner;

use std::sync::Arc;

use super::SchedulerCore;
use crate::core::Task;
use crate::runtime::TaskPool;

/// Every task is an independent pool job.
pub(super) struct ConcurrentStrategy {
    pool: Arc<dyn TaskPool>,
}

impl ConcurrentStrategy {
    pub(super) fn new(pool: Arc<dyn TaskPool>) -> Self {
        Self { pool }
    }

    pub(super) fn dispatch<O: Clone + Send + 'static>(
        &self,
        core: &Arc<SchedulerCore<O>>,
        task: Task<O>,
    ) {
        let job_core = Arc::clone(core);
        if let Err(e) = self.pool.execute(Box::new(move || job_core.execute(task))) {
            core.reject(&e);
        }
    }
}

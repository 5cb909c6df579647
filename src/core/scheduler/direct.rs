use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use super::SchedulerCore;
use crate::core::Task;

/// Inline execution serialized across inserting threads.
///
/// Reentrant so a handler may insert into its own scheduler; released fairly so
/// contending callers run in the order they queued on the lock.
#[derive(Default)]
pub(super) struct DirectThreadsafeStrategy {
    lock: ReentrantMutex<()>,
}

impl DirectThreadsafeStrategy {
    pub(super) fn dispatch<O: Clone + Send + 'static>(
        &self,
        core: &Arc<SchedulerCore<O>>,
        task: Task<O>,
    ) {
        let guard = self.lock.lock();
        core.execute(task);
        ReentrantMutexGuard::unlock_fair(guard);
    }
}

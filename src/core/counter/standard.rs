use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{release, wait_for_zero, ObjectCounter};

/// Unbounded counter. Every on-ramp variant succeeds immediately.
///
/// Exists so the unhandled count can be observed and so that
/// [`wait_until_empty`](ObjectCounter::wait_until_empty) can prove drainage.
#[derive(Debug)]
pub struct StandardObjectCounter {
    name: String,
    count: AtomicU64,
    sleep_duration: Duration,
}

impl StandardObjectCounter {
    /// Create a counter; `sleep_duration` is the poll interval of `wait_until_empty`.
    pub fn new(name: impl Into<String>, sleep_duration: Duration) -> Self {
        Self {
            name: name.into(),
            count: AtomicU64::new(0),
            sleep_duration,
        }
    }

    /// Counter name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ObjectCounter for StandardObjectCounter {
    fn on_ramp(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn attempt_on_ramp(&self) -> bool {
        self.count.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn force_on_ramp(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn off_ramp(&self) {
        release(&self.count, &self.name);
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    fn wait_until_empty(&self) {
        wait_for_zero(&self.count, self.sleep_duration);
    }
}

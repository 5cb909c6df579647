use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::trace;

use super::{release, wait_for_zero, ObjectCounter};
use crate::runtime::managed_blocking;

/// Bounded counter that applies backpressure once `capacity` tasks are unhandled.
///
/// - `attempt_on_ramp` admits with a compare-and-increment and fails at capacity.
/// - `on_ramp` sleep-polls until admitted. Blocked callers are admitted in
///   arrival order, and `attempt_on_ramp` fails while any of them is waiting.
/// - `force_on_ramp` always admits and may push the count past capacity; the
///   count stays above capacity until enough off-ramps bring it back down.
#[derive(Debug)]
pub struct BackpressureObjectCounter {
    name: String,
    capacity: u64,
    sleep_duration: Duration,
    count: AtomicU64,
    /// Blocked `on_ramp` callers currently queued.
    waiters: AtomicU64,
    next_ticket: AtomicU64,
    now_serving: AtomicU64,
}

impl BackpressureObjectCounter {
    /// Create a counter admitting at most `capacity` unhandled tasks.
    ///
    /// `sleep_duration` is the poll interval for blocked `on_ramp` and
    /// `wait_until_empty` calls.
    pub fn new(name: impl Into<String>, capacity: u64, sleep_duration: Duration) -> Self {
        Self {
            name: name.into(),
            capacity,
            sleep_duration,
            count: AtomicU64::new(0),
            waiters: AtomicU64::new(0),
            next_ticket: AtomicU64::new(0),
            now_serving: AtomicU64::new(0),
        }
    }

    /// Counter name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of callers blocked in `on_ramp`.
    #[must_use]
    pub fn waiting(&self) -> u64 {
        self.waiters.load(Ordering::Acquire)
    }

    /// Compare-and-increment below capacity.
    fn try_admit(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

impl ObjectCounter for BackpressureObjectCounter {
    fn on_ramp(&self) {
        if self.attempt_on_ramp() {
            return;
        }

        self.waiters.fetch_add(1, Ordering::AcqRel);
        let ticket = self.next_ticket.fetch_add(1, Ordering::AcqRel);
        trace!(counter = %self.name, ticket, "waiting for capacity");

        managed_blocking(|| loop {
            if self.now_serving.load(Ordering::Acquire) == ticket && self.try_admit() {
                break;
            }
            thread::sleep(self.sleep_duration);
        });

        self.now_serving.fetch_add(1, Ordering::AcqRel);
        self.waiters.fetch_sub(1, Ordering::AcqRel);
    }

    fn attempt_on_ramp(&self) -> bool {
        if self.waiters.load(Ordering::Acquire) > 0 {
            return false;
        }
        self.try_admit()
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

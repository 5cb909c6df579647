//! Object counters: pluggable accounting of unhandled tasks.
//!
//! A counter tracks how many tasks have entered a scheduler (on-ramp) without
//! yet having been fully handled (off-ramp). Every successful on-ramp must be
//! matched by exactly one off-ramp, whatever the task outcome.
//!
//! | Variant | Ceiling | Purpose |
//! |---|---|---|
//! | [`NoOpObjectCounter`] | none | zero-cost when nothing observes the count |
//! | [`StandardObjectCounter`] | none | observable count, enables flushing |
//! | [`BackpressureObjectCounter`] | fixed | blocks or rejects at capacity |
//! | [`MultiObjectCounter`] | per part | applies each event to several counters |

mod backpressure;
mod multi;
mod no_op;
mod standard;

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

pub use backpressure::BackpressureObjectCounter;
pub use multi::MultiObjectCounter;
pub use no_op::NoOpObjectCounter;
pub use standard::StandardObjectCounter;

use crate::runtime::managed_blocking;

/// Strategy for counting unhandled tasks.
///
/// All implementations are thread-safe; insertion threads and execution
/// threads mutate the same counter concurrently.
pub trait ObjectCounter: Send + Sync + std::fmt::Debug {
    /// Record that a task has entered, waiting while the counter is at capacity.
    fn on_ramp(&self);

    /// Record that a task has entered if there is room; never blocks.
    fn attempt_on_ramp(&self) -> bool;

    /// Record that a task has entered, ignoring any capacity.
    fn force_on_ramp(&self);

    /// Record that a task has been fully handled.
    ///
    /// # Panics
    ///
    /// Counting implementations panic if this would take the count below zero,
    /// which means a task was released twice.
    fn off_ramp(&self);

    /// Current number of unhandled tasks.
    fn count(&self) -> u64;

    /// Block until the count reaches zero.
    fn wait_until_empty(&self);
}

/// Decrement `count`, panicking on underflow.
pub(crate) fn release(count: &AtomicU64, name: &str) {
    if count
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| current.checked_sub(1))
        .is_err()
    {
        panic!("object counter `{name}` was off-ramped more times than it was on-ramped");
    }
}

/// Sleep-poll until `count` drops to zero.
pub(crate) fn wait_for_zero(count: &AtomicU64, sleep_duration: Duration) {
    if count.load(Ordering::Acquire) == 0 {
        return;
    }
    managed_blocking(|| {
        while count.load(Ordering::Acquire) > 0 {
            thread::sleep(sleep_duration);
        }
    });
}

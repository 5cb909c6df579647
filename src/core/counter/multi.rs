use std::sync::Arc;

use super::{NoOpObjectCounter, ObjectCounter};

/// Applies every event to each wrapped counter, in order.
///
/// The first counter is the scheduler's own (inner) counter and is the one
/// reported by [`count`](ObjectCounter::count); later counters are shared
/// capacity domains supplied by the embedding model. A failed
/// `attempt_on_ramp` rolls back the counters that had already admitted.
#[derive(Debug)]
pub struct MultiObjectCounter {
    counters: Vec<Arc<dyn ObjectCounter>>,
}

impl MultiObjectCounter {
    /// Wrap `counters`, applied first to last.
    #[must_use]
    pub fn new(counters: Vec<Arc<dyn ObjectCounter>>) -> Self {
        Self { counters }
    }

    /// Combine an inner and an outer counter.
    ///
    /// With only one present it is returned as is; with neither, a no-op counter.
    #[must_use]
    pub fn compose(
        inner: Option<Arc<dyn ObjectCounter>>,
        outer: Option<Arc<dyn ObjectCounter>>,
    ) -> Arc<dyn ObjectCounter> {
        match (inner, outer) {
            (Some(inner), Some(outer)) => Arc::new(Self::new(vec![inner, outer])),
            (Some(counter), None) | (None, Some(counter)) => counter,
            (None, None) => Arc::new(NoOpObjectCounter),
        }
    }
}

impl ObjectCounter for MultiObjectCounter {
    fn on_ramp(&self) {
        for counter in &self.counters {
            counter.on_ramp();
        }
    }

    fn attempt_on_ramp(&self) -> bool {
        for (index, counter) in self.counters.iter().enumerate() {
            if !counter.attempt_on_ramp() {
                for admitted in &self.counters[..index] {
                    admitted.off_ramp();
                }
                return false;
            }
        }
        true
    }

    fn force_on_ramp(&self) {
        for counter in &self.counters {
            counter.force_on_ramp();
        }
    }

    fn off_ramp(&self) {
        for counter in &self.counters {
            counter.off_ramp();
        }
    }

    fn count(&self) -> u64 {
        self.counters.first().map_or(0, |counter| counter.count())
    }

    fn wait_until_empty(&self) {
        for counter in &self.counters {
            counter.wait_until_empty();
        }
    }
}

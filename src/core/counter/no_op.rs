use super::ObjectCounter;

/// Counter that counts nothing. `count()` is always zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObjectCounter;

impl ObjectCounter for NoOpObjectCounter {
    fn on_ramp(&self) {}

    fn attempt_on_ramp(&self) -> bool {
        true
    }

    fn force_on_ramp(&self) {}

    fn off_ramp(&self) {}

    fn count(&self) -> u64 {
        0
    }

    fn wait_until_empty(&self) {}
}

//! Busy-fraction measurement for a single logical execution thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::util::Clock;

#[derive(Debug)]
struct TimerState {
    window_start: Instant,
    busy: Duration,
    active_since: Option<Instant>,
    /// Nesting depth; a reentrant insert runs a handler inside a handler.
    depth: u32,
}

/// Accumulates time spent inside handlers between samples.
///
/// The executing thread brackets each handler with [`activate`](Self::activate)
/// and [`deactivate`](Self::deactivate); an observer calls
/// [`busy_fraction`](Self::busy_fraction), which reports the share of the
/// window since the previous sample spent busy and starts a new window.
#[derive(Debug)]
pub struct BusyTimer {
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
}

impl BusyTimer {
    /// Timer whose first window starts now.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            state: Mutex::new(TimerState {
                window_start: now,
                busy: Duration::ZERO,
                active_since: None,
                depth: 0,
            }),
        }
    }

    /// The execution thread started a handler.
    ///
    /// Calls nest; only the outermost pair starts and stops timing.
    pub fn activate(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.depth += 1;
        if state.depth == 1 {
            state.active_since = Some(now);
        }
    }

    /// The execution thread finished a handler.
    pub fn deactivate(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.depth == 0 {
            return;
        }
        state.depth -= 1;
        if state.depth > 0 {
            return;
        }
        if let Some(since) = state.active_since.take() {
            // A sample may have moved the window start past `since`.
            let from = since.max(state.window_start);
            state.busy += now.saturating_duration_since(from);
        }
    }

    /// Fraction of the window since the last sample spent busy, in `[0, 1]`.
    pub fn busy_fraction(&self) -> f64 {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let mut busy = state.busy;
        if let Some(since) = state.active_since {
            busy += now.saturating_duration_since(since.max(state.window_start));
        }
        let window = now.saturating_duration_since(state.window_start);

        state.window_start = now;
        state.busy = Duration::ZERO;

        if window.is_zero() {
            return if state.active_since.is_some() { 1.0 } else { 0.0 };
        }
        (busy.as_secs_f64() / window.as_secs_f64()).clamp(0.0, 1.0)
    }
}

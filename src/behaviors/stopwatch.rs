//! Per-call elapsed-time measurement.

use std::time::{Duration, Instant};

/// Timer started at call entry and stopped exactly once at call exit.
///
/// `stop` consumes the stopwatch. Each intercepted call owns its own;
/// behavior instances never hold one.
#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start_new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time since start, without stopping.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stop(self) -> Duration {
        self.started.elapsed()
    }
}

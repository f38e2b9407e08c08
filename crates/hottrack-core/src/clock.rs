//! Monotonic nanosecond clock consumed by the tracker.
//!
//! The tracker treats timestamp `0` as *never accessed*, so a conforming
//! clock must never return 0.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// A monotonic nanosecond time source.
pub trait Clock: Send + Sync + 'static {
    /// Current time in nanoseconds. Must be monotonic and never 0.
    fn now_ns(&self) -> u64;
}

/// Production clock: nanoseconds elapsed since the clock was created.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        // 0 is reserved as the "never accessed" sentinel
        (self.origin.elapsed().as_nanos() as u64).max(1)
    }
}

/// Deterministic clock for tests and simulations.
///
/// Starts at the given nanosecond value and only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now_ns: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            now_ns: AtomicU64::new(start_ns.max(1)),
        }
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        self.now_ns
            .fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Advances the clock by raw nanoseconds.
    pub fn advance_ns(&self, ns: u64) {
        self.now_ns.fetch_add(ns, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_returns_zero() {
        let clock = MonotonicClock::new();
        assert!(clock.now_ns() >= 1);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.now_ns();
        assert!(b > a);
    }

    #[test]
    fn test_manual_clock_only_moves_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ns(), 1_000);
        assert_eq!(clock.now_ns(), 1_000);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now_ns(), 1_000_001_000);

        clock.advance_ns(5);
        assert_eq!(clock.now_ns(), 1_000_001_005);
    }

    #[test]
    fn test_manual_clock_floors_start_at_one() {
        let clock = ManualClock::new(0);
        assert_eq!(clock.now_ns(), 1);
    }
}

//! Per-item access frequency statistics.
//!
//! An [`AccessFreq`] is embedded in every tracked inode and range item. It
//! holds the last access timestamps, saturating access counters, and
//! fixed-point exponentially-smoothed inter-arrival averages from which the
//! temperature is derived.
//!
//! Every field is an individually-aligned atomic updated with relaxed
//! ordering. Counter bumps are exact; timestamp and average stores from
//! concurrent recorders may interleave and lose a sample, but can never
//! corrupt the record. The moving-average arithmetic tolerates lost samples.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering::Relaxed};

/// Smoothing factor of the moving averages is `1 / 2^FREQ_POWER`.
pub const FREQ_POWER: u32 = 4;

/// Whether an I/O access was a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Access statistics for one tracked item.
///
/// Read and write statistics are fully independent. The averages start at
/// `u64::MAX` so that a brand-new item looks cold, not hot: a few quick
/// accesses must not instantly make a file appear busy.
#[derive(Debug)]
pub struct AccessFreq {
    last_read_ns: AtomicU64,
    last_write_ns: AtomicU64,
    nr_reads: AtomicU32,
    nr_writes: AtomicU32,
    avg_delta_reads: AtomicU64,
    avg_delta_writes: AtomicU64,
    last_temp: AtomicU32,
}

/// A relaxed point-in-time copy of an [`AccessFreq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreqSnapshot {
    pub last_read_ns: u64,
    pub last_write_ns: u64,
    pub nr_reads: u32,
    pub nr_writes: u32,
    pub avg_delta_reads: u64,
    pub avg_delta_writes: u64,
    pub last_temp: u32,
}

impl AccessFreq {
    /// A pristine record: never accessed, maximally cold averages.
    pub fn new() -> Self {
        Self {
            last_read_ns: AtomicU64::new(0),
            last_write_ns: AtomicU64::new(0),
            nr_reads: AtomicU32::new(0),
            nr_writes: AtomicU32::new(0),
            avg_delta_reads: AtomicU64::new(u64::MAX),
            avg_delta_writes: AtomicU64::new(u64::MAX),
            last_temp: AtomicU32::new(0),
        }
    }

    /// Folds one access at `now_ns` into the statistics.
    ///
    /// The counter is bumped first, the matching average is re-smoothed from
    /// the previous timestamp, and the timestamp then moves to `now_ns`.
    pub fn record(&self, now_ns: u64, kind: AccessKind) {
        match kind {
            AccessKind::Read => {
                saturating_inc(&self.nr_reads);

                let prev = self.last_read_ns.load(Relaxed);
                let avg = self.avg_delta_reads.load(Relaxed);
                self.avg_delta_reads.store(smooth(avg, prev, now_ns), Relaxed);
                self.last_read_ns.store(now_ns, Relaxed);
            }
            AccessKind::Write => {
                saturating_inc(&self.nr_writes);

                let prev = self.last_write_ns.load(Relaxed);
                let avg = self.avg_delta_writes.load(Relaxed);
                self.avg_delta_writes.store(smooth(avg, prev, now_ns), Relaxed);
                self.last_write_ns.store(now_ns, Relaxed);
            }
        }
    }

    pub fn last_read_ns(&self) -> u64 {
        self.last_read_ns.load(Relaxed)
    }

    pub fn last_write_ns(&self) -> u64 {
        self.last_write_ns.load(Relaxed)
    }

    pub fn nr_reads(&self) -> u32 {
        self.nr_reads.load(Relaxed)
    }

    pub fn nr_writes(&self) -> u32 {
        self.nr_writes.load(Relaxed)
    }

    pub fn avg_delta_reads(&self) -> u64 {
        self.avg_delta_reads.load(Relaxed)
    }

    pub fn avg_delta_writes(&self) -> u64 {
        self.avg_delta_writes.load(Relaxed)
    }

    /// The temperature stored at the last (re)bucketing.
    pub fn last_temp(&self) -> u32 {
        self.last_temp.load(Relaxed)
    }

    pub fn set_last_temp(&self, temp: u32) {
        self.last_temp.store(temp, Relaxed);
    }

    pub fn snapshot(&self) -> FreqSnapshot {
        FreqSnapshot {
            last_read_ns: self.last_read_ns(),
            last_write_ns: self.last_write_ns(),
            nr_reads: self.nr_reads(),
            nr_writes: self.nr_writes(),
            avg_delta_reads: self.avg_delta_reads(),
            avg_delta_writes: self.avg_delta_writes(),
            last_temp: self.last_temp(),
        }
    }
}

impl Default for AccessFreq {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter bump that sticks at `u32::MAX`. Unlike the timestamp and average
/// stores, counter increments are never lost under contention.
fn saturating_inc(counter: &AtomicU32) {
    let _ = counter.fetch_update(Relaxed, Relaxed, |n| {
        if n == u32::MAX {
            None
        } else {
            Some(n + 1)
        }
    });
}

/// Fixed-point exponential moving average with factor `1 / 2^FREQ_POWER`.
///
/// The delta is pre-shifted before accumulation and the first sample relies
/// on wrapping arithmetic to collapse the `u64::MAX` initial value, so the
/// whole update is overflow-safe.
fn smooth(avg: u64, prev_ns: u64, now_ns: u64) -> u64 {
    let delta = now_ns.saturating_sub(prev_ns) >> FREQ_POWER;
    avg.wrapping_shl(FREQ_POWER)
        .wrapping_sub(avg)
        .wrapping_add(delta)
        >> FREQ_POWER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_pristine() {
        let freq = AccessFreq::new();
        assert_eq!(freq.nr_reads(), 0);
        assert_eq!(freq.nr_writes(), 0);
        assert_eq!(freq.last_read_ns(), 0);
        assert_eq!(freq.last_write_ns(), 0);
        assert_eq!(freq.avg_delta_reads(), u64::MAX);
        assert_eq!(freq.avg_delta_writes(), u64::MAX);
        assert_eq!(freq.last_temp(), 0);
    }

    #[test]
    fn test_read_and_write_statistics_are_independent() {
        let freq = AccessFreq::new();

        freq.record(1_000, AccessKind::Read);
        assert_eq!(freq.nr_reads(), 1);
        assert_eq!(freq.nr_writes(), 0);
        assert_eq!(freq.last_read_ns(), 1_000);
        assert_eq!(freq.last_write_ns(), 0);
        assert_eq!(freq.avg_delta_writes(), u64::MAX);

        freq.record(2_000, AccessKind::Write);
        assert_eq!(freq.nr_reads(), 1);
        assert_eq!(freq.nr_writes(), 1);
        assert_eq!(freq.last_write_ns(), 2_000);
    }

    #[test]
    fn test_first_sample_collapses_initial_average() {
        let freq = AccessFreq::new();
        let now = 1 << 30;

        freq.record(now, AccessKind::Read);

        // (MAX<<4) - MAX + delta wraps to delta - 15, then >> 4
        let delta = now >> FREQ_POWER;
        let expected = delta.wrapping_sub(15) >> FREQ_POWER;
        assert_eq!(freq.avg_delta_reads(), expected);
    }

    #[test]
    fn test_average_smooths_toward_observed_delta() {
        let freq = AccessFreq::new();

        // A steady cadence of one access per microsecond
        let mut now = 1_000;
        for _ in 0..64 {
            freq.record(now, AccessKind::Read);
            now += 1_000;
        }

        // 1000ns cadence pre-shifted by FREQ_POWER is 62; the average must
        // have converged to that scale
        let avg = freq.avg_delta_reads();
        assert!(avg < 1_000, "average did not converge: {avg}");
    }

    #[test]
    fn test_faster_cadence_yields_smaller_average() {
        let fast = AccessFreq::new();
        let slow = AccessFreq::new();

        let mut now = 1_000;
        for _ in 0..32 {
            fast.record(now, AccessKind::Read);
            now += 100;
        }
        let mut now = 1_000;
        for _ in 0..32 {
            slow.record(now, AccessKind::Read);
            now += 100_000;
        }

        assert!(fast.avg_delta_reads() < slow.avg_delta_reads());
    }

    #[test]
    fn test_counters_saturate() {
        let freq = AccessFreq::new();
        freq.nr_reads.store(u32::MAX, Relaxed);
        freq.record(10, AccessKind::Read);
        assert_eq!(freq.nr_reads(), u32::MAX);
    }

    #[test]
    fn test_snapshot_is_consistent_copy() {
        let freq = AccessFreq::new();
        freq.record(5_000, AccessKind::Write);

        let snap = freq.snapshot();
        assert_eq!(snap.nr_writes, 1);
        assert_eq!(snap.last_write_ns, 5_000);
        assert_eq!(snap.nr_reads, 0);
        assert_eq!(snap.avg_delta_reads, u64::MAX);
    }
}

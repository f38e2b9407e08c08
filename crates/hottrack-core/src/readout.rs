//! Per-item diagnostic readout.
//!
//! [`HeatInfo`] is the ABI-stable struct handed to hosts that surface
//! per-file heat to user space. Its byte layout is frozen: 80 bytes, fields
//! in the order below, reserved space for future expansion.

use serde::Serialize;

use crate::freq::FreqSnapshot;

/// Point-in-time heat readout for one tracked inode or range.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatInfo {
    /// 1 if a live tracking item backs this readout, 0 otherwise.
    pub live: u8,
    pub resv: [u8; 3],
    /// Temperature at readout time.
    pub temp: u32,
    pub avg_delta_reads: u64,
    pub avg_delta_writes: u64,
    pub last_read_time: u64,
    pub last_write_time: u64,
    pub num_reads: u32,
    pub num_writes: u32,
    /// Reserved for future expansion.
    pub future: [u64; 4],
}

impl HeatInfo {
    /// Readout of a live item from its statistics and current temperature.
    pub fn from_snapshot(snap: &FreqSnapshot, temp: u32) -> Self {
        Self {
            live: 1,
            resv: [0; 3],
            temp,
            avg_delta_reads: snap.avg_delta_reads,
            avg_delta_writes: snap.avg_delta_writes,
            last_read_time: snap.last_read_ns,
            last_write_time: snap.last_write_ns,
            num_reads: snap.nr_reads,
            num_writes: snap.nr_writes,
            future: [0; 4],
        }
    }

    /// Readout for a key with no live tracking item: all-zero, `live == 0`.
    pub fn dead() -> Self {
        Self {
            live: 0,
            resv: [0; 3],
            temp: 0,
            avg_delta_reads: 0,
            avg_delta_writes: 0,
            last_read_time: 0,
            last_write_time: 0,
            num_reads: 0,
            num_writes: 0,
            future: [0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{align_of, size_of};

    use super::*;
    use crate::freq::{AccessFreq, AccessKind};

    #[test]
    fn test_abi_size_and_alignment() {
        assert_eq!(size_of::<HeatInfo>(), 80);
        assert_eq!(align_of::<HeatInfo>(), 8);
    }

    #[test]
    fn test_abi_field_offsets() {
        let info = HeatInfo::dead();
        let base = &info as *const HeatInfo as usize;

        assert_eq!(&info.live as *const u8 as usize - base, 0);
        assert_eq!(&info.resv as *const [u8; 3] as usize - base, 1);
        assert_eq!(&info.temp as *const u32 as usize - base, 4);
        assert_eq!(&info.avg_delta_reads as *const u64 as usize - base, 8);
        assert_eq!(&info.avg_delta_writes as *const u64 as usize - base, 16);
        assert_eq!(&info.last_read_time as *const u64 as usize - base, 24);
        assert_eq!(&info.last_write_time as *const u64 as usize - base, 32);
        assert_eq!(&info.num_reads as *const u32 as usize - base, 40);
        assert_eq!(&info.num_writes as *const u32 as usize - base, 44);
        assert_eq!(&info.future as *const [u64; 4] as usize - base, 48);
    }

    #[test]
    fn test_from_snapshot_carries_statistics() {
        let freq = AccessFreq::new();
        freq.record(7_000, AccessKind::Read);
        freq.record(9_000, AccessKind::Write);

        let info = HeatInfo::from_snapshot(&freq.snapshot(), 42);
        assert_eq!(info.live, 1);
        assert_eq!(info.temp, 42);
        assert_eq!(info.num_reads, 1);
        assert_eq!(info.num_writes, 1);
        assert_eq!(info.last_read_time, 7_000);
        assert_eq!(info.last_write_time, 9_000);
        assert_eq!(info.future, [0; 4]);
    }

    #[test]
    fn test_dead_readout_is_zeroed() {
        let info = HeatInfo::dead();
        assert_eq!(info.live, 0);
        assert_eq!(info.temp, 0);
        assert_eq!(info.num_reads, 0);
        assert_eq!(info.num_writes, 0);
    }
}

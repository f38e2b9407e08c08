//! Budgeted eviction of cold tracking items.
//!
//! One primitive serves both pressure sources: the aging worker's internal
//! high-water evictor (budget in bytes) and the external shrinker (budget in
//! items). The primitive walks the inode-kind buckets coldest-first and
//! reclaims items nobody but the index still references; reclaiming an inode
//! cascades to all of its ranges.

use tracing::debug;

use hottrack_core::temperature::MAP_SIZE;

use crate::tracker::Tracker;

impl Tracker {
    /// Reclaims cold items until `budget` of cost (as measured by `cost`)
    /// has been freed or every bucket has been scanned. Returns the freed
    /// cost.
    ///
    /// Items with outstanding references (in-flight updates, held lookups,
    /// aging pins) are skipped; they cannot be cold enough to matter and
    /// must not be pulled out from under their holders.
    pub(crate) fn evict(&self, budget: u64, cost: fn(&Tracker) -> u64) -> u64 {
        if budget == 0 {
            return 0;
        }
        let mut remaining = budget as i128;
        let mut freed = 0u64;

        for bucket in 0..MAP_SIZE {
            {
                let mut idx = self.inodes.lock().unwrap();
                for entry in idx.map.bucket_entries(bucket) {
                    // only the index holds it: safe to drop. The index lock
                    // gates every clone path, so the count cannot grow under
                    // us here.
                    if entry.strong_count() != 1 {
                        continue;
                    }
                    let Some(item) = entry.upgrade() else {
                        continue;
                    };

                    let before = cost(self);
                    self.unlink_inode_item_locked(&mut idx, &item);
                    drop(item);
                    let delta = before.saturating_sub(cost(self));

                    freed += delta;
                    remaining -= delta as i128;
                    if remaining <= 0 {
                        break;
                    }
                }
            }
            if remaining <= 0 {
                break;
            }
            std::thread::yield_now();
        }
        freed
    }

    /// Internal evictor: brings the byte usage back under the configured
    /// high-water threshold. Disabled while the threshold tunable is 0.
    pub(crate) fn evict_to_threshold(&self) {
        let threshold_mib = self.tunables().memory_high_threshold_mib();
        if threshold_mib == 0 {
            return;
        }
        let threshold = threshold_mib * 1024 * 1024;
        let usage = self.mem_usage_bytes();
        if usage <= threshold {
            return;
        }

        let freed = self.evict(usage - threshold, Tracker::mem_usage_bytes);
        debug!(freed_bytes = freed, "memory evictor pass");
    }
}

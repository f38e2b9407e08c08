//! The memory-pressure hook.
//!
//! The host's reclaim machinery drives the tracker through the [`Shrinker`]
//! trait: `count` reports how much is reclaimable, `scan` reclaims up to the
//! requested amount and reports what actually went. A scan issued from a
//! context that forbids filesystem reclaim is answered with
//! [`ShrinkOutcome::Stop`], a throttling signal rather than an error.

use tracing::debug;

use crate::tracker::Tracker;

/// What the host wants a shrinker scan to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkControl {
    /// How many objects the host would like reclaimed.
    pub nr_to_scan: u64,
    /// Whether the calling allocation context may touch filesystem state.
    pub fs_reclaim_allowed: bool,
}

/// Result of one shrinker scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShrinkOutcome {
    /// The shrinker cannot run in this context; back off.
    Stop,
    /// Number of objects actually reclaimed.
    Freed(u64),
}

/// A reclaim source the host can plug into its memory-pressure loop.
pub trait Shrinker: Send + Sync {
    /// Upper bound of objects a scan could reclaim.
    fn count(&self) -> u64;

    /// Reclaims up to `ctl.nr_to_scan` objects.
    fn scan(&self, ctl: &ShrinkControl) -> ShrinkOutcome;
}

impl Shrinker for Tracker {
    fn count(&self) -> u64 {
        self.item_count()
    }

    fn scan(&self, ctl: &ShrinkControl) -> ShrinkOutcome {
        if !ctl.fs_reclaim_allowed {
            return ShrinkOutcome::Stop;
        }
        let freed = self.evict(ctl.nr_to_scan, Tracker::item_count);
        debug!(requested = ctl.nr_to_scan, freed, "shrinker scan");
        ShrinkOutcome::Freed(freed)
    }
}

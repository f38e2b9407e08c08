//! The two tracked item kinds.
//!
//! An [`InodeItem`] carries whole-file statistics and owns the ordered index
//! of its [`RangeItem`]s. Items are shared as `Arc`s: the index holds the one
//! owning reference, every lookup and in-flight update clones it, and the
//! strong count therefore *is* the item's reference count. A range's back
//! reference to its owner is a plain inode number and never extends the
//! owner's lifetime.

use std::{
    collections::BTreeMap,
    mem::size_of,
    sync::{Arc, Mutex},
};

use hottrack_core::freq::AccessFreq;

use crate::map::MapLink;

/// log2 of the tracked range size.
pub const RANGE_BITS: u32 = 20;
/// Tracked ranges span this many bytes, aligned on the same boundary.
pub const RANGE_LEN: u64 = 1 << RANGE_BITS;

/// Per-file tracking item.
#[derive(Debug)]
pub struct InodeItem {
    ino: u64,
    freq: AccessFreq,
    /// Ordered range index of this file, keyed by aligned start offset.
    ranges: Mutex<BTreeMap<u64, Arc<RangeItem>>>,
    map_link: MapLink,
}

impl InodeItem {
    pub(crate) fn new(ino: u64) -> Self {
        Self {
            ino,
            freq: AccessFreq::new(),
            ranges: Mutex::new(BTreeMap::new()),
            map_link: MapLink::new(),
        }
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    /// Whole-file access statistics.
    pub fn freq(&self) -> &AccessFreq {
        &self.freq
    }

    /// The range item covering `pos`, with a reference, if one exists.
    pub fn range_at(&self, pos: u64) -> Option<Arc<RangeItem>> {
        let ranges = self.ranges.lock().unwrap();
        find_covering(&ranges, pos)
    }

    /// Number of live range items under this inode.
    pub fn range_count(&self) -> usize {
        self.ranges.lock().unwrap().len()
    }

    pub(crate) fn ranges(&self) -> &Mutex<BTreeMap<u64, Arc<RangeItem>>> {
        &self.ranges
    }

    /// References to all current ranges, in offset order.
    pub(crate) fn ranges_snapshot(&self) -> Vec<Arc<RangeItem>> {
        self.ranges.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn map_link(&self) -> &MapLink {
        &self.map_link
    }

    /// Notional size charged against the tracker's byte budget.
    pub(crate) fn footprint() -> u64 {
        size_of::<Self>() as u64
    }
}

/// Per-range tracking item.
#[derive(Debug)]
pub struct RangeItem {
    /// Byte offset, aligned to [`RANGE_LEN`].
    start: u64,
    len: u64,
    /// Owning inode; informational only, the owner outlives the range.
    ino: u64,
    freq: AccessFreq,
    map_link: MapLink,
}

impl RangeItem {
    pub(crate) fn new(ino: u64, start: u64) -> Self {
        Self {
            start,
            len: RANGE_LEN,
            ino,
            freq: AccessFreq::new(),
            map_link: MapLink::new(),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    pub fn freq(&self) -> &AccessFreq {
        &self.freq
    }

    pub(crate) fn map_link(&self) -> &MapLink {
        &self.map_link
    }

    pub(crate) fn footprint() -> u64 {
        size_of::<Self>() as u64
    }
}

/// Interval lookup: the range whose half-open span contains `pos`.
///
/// Ranges are fixed-size and aligned, so at most one can match.
pub(crate) fn find_covering(
    tree: &BTreeMap<u64, Arc<RangeItem>>,
    pos: u64,
) -> Option<Arc<RangeItem>> {
    tree.range(..=pos).next_back().and_then(|(_, item)| {
        if pos < item.start().saturating_add(item.len()) {
            Some(Arc::clone(item))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_inode_item_is_empty_and_detached() {
        let item = InodeItem::new(42);
        assert_eq!(item.ino(), 42);
        assert_eq!(item.range_count(), 0);
        assert!(!item.map_link().is_attached());
        assert_eq!(item.freq().nr_reads(), 0);
    }

    #[test]
    fn test_range_item_geometry() {
        let range = RangeItem::new(7, 3 * RANGE_LEN);
        assert_eq!(range.start(), 3 * RANGE_LEN);
        assert_eq!(range.len(), RANGE_LEN);
        assert_eq!(range.ino(), 7);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_find_covering_hits_within_span() {
        let mut tree = BTreeMap::new();
        tree.insert(0, Arc::new(RangeItem::new(1, 0)));
        tree.insert(2 * RANGE_LEN, Arc::new(RangeItem::new(1, 2 * RANGE_LEN)));

        assert_eq!(find_covering(&tree, 0).unwrap().start(), 0);
        assert_eq!(find_covering(&tree, RANGE_LEN - 1).unwrap().start(), 0);
        // the gap between the two ranges is uncovered
        assert!(find_covering(&tree, RANGE_LEN).is_none());
        assert_eq!(
            find_covering(&tree, 2 * RANGE_LEN + 123).unwrap().start(),
            2 * RANGE_LEN
        );
        assert!(find_covering(&tree, 3 * RANGE_LEN).is_none());
    }

    #[test]
    fn test_find_covering_empty_tree() {
        let tree = BTreeMap::new();
        assert!(find_covering(&tree, 0).is_none());
    }
}

//! The temperature map: insertion-ordered buckets of tracked items.
//!
//! One [`TempMap`] exists per item kind. A bucket is a `BTreeMap` keyed by a
//! monotonically increasing sequence number, which gives the three operations
//! the bucket lists need: append-to-tail (insert at the next sequence),
//! detach by handle (remove by the stored sequence), and coldest-first
//! iteration in insertion order.
//!
//! Buckets hold [`Weak`] references only; map membership never extends an
//! item's lifetime. Each item carries a [`MapLink`] recording its current
//! `(bucket, seq)` slot; a `None` slot means the item has been detached and
//! is on its way out.
//!
//! All access to a `TempMap` and to the `MapLink`s of its items happens under
//! the one lock that guards that map (the root lock for the inode kind, the
//! range-map lock for the range kind).

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, Weak},
};

use hottrack_core::temperature::MAP_SIZE;

/// Where an item currently sits in its temperature map.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MapSlot {
    bucket: usize,
    seq: u64,
}

/// An item's membership handle into its temperature map.
#[derive(Debug)]
pub(crate) struct MapLink {
    slot: Mutex<Option<MapSlot>>,
}

impl MapLink {
    /// A fresh, detached link.
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

/// The bucket array for one item kind.
#[derive(Debug)]
pub(crate) struct TempMap<T> {
    buckets: Vec<BTreeMap<u64, Weak<T>>>,
    next_seq: u64,
}

impl<T> TempMap<T> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: (0..MAP_SIZE).map(|_| BTreeMap::new()).collect(),
            next_seq: 0,
        }
    }

    /// Appends `item` to the tail of `bucket` and records the slot in its
    /// link. The link must be detached.
    pub(crate) fn attach(&mut self, link: &MapLink, bucket: usize, item: &Arc<T>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.buckets[bucket].insert(seq, Arc::downgrade(item));

        let mut slot = link.slot.lock().unwrap();
        debug_assert!(slot.is_none(), "attaching an already-attached item");
        *slot = Some(MapSlot { bucket, seq });
    }

    /// Removes the link's item from its bucket. No-op if already detached.
    pub(crate) fn detach(&mut self, link: &MapLink) {
        if let Some(slot) = link.slot.lock().unwrap().take() {
            self.buckets[slot.bucket].remove(&slot.seq);
        }
    }

    /// Moves the link's item to the tail of `new_bucket`.
    ///
    /// Returns `false` without touching anything if the item has been
    /// detached in the meantime.
    pub(crate) fn move_to_tail(&mut self, link: &MapLink, new_bucket: usize, item: &Arc<T>) -> bool {
        let mut guard = link.slot.lock().unwrap();
        let Some(slot) = guard.take() else {
            return false;
        };
        self.buckets[slot.bucket].remove(&slot.seq);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.buckets[new_bucket].insert(seq, Arc::downgrade(item));
        *guard = Some(MapSlot {
            bucket: new_bucket,
            seq,
        });
        true
    }

    /// The items of one bucket, coldest-insertion first.
    pub(crate) fn bucket_entries(&self, bucket: usize) -> Vec<Weak<T>> {
        self.buckets[bucket].values().cloned().collect()
    }

    pub(crate) fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets[bucket].len()
    }
}

//! The tracker root: per-volume tracking state and the host-facing API.
//!
//! A [`Tracker`] owns the ordered inode index, the two temperature maps, the
//! memory accounting, and the aging worker. The filesystem layer calls
//! [`record_io`](Tracker::record_io) on every read and write; everything else
//! (aging, rebucketing, eviction) happens behind its back.
//!
//! ## Locking
//!
//! - `inodes` guards the inode index *and* the inode-kind buckets.
//! - each `InodeItem` guards its own range index.
//! - `range_map` guards the range-kind buckets.
//!
//! Lock order is strictly `inodes` → item ranges → `range_map`; no path
//! acquires them the other way around. Item statistics are relaxed atomics
//! and take no lock at all.
//!
//! ## References
//!
//! Items are handed out as `Arc`s. The index holds the one owning reference;
//! dropping an item from the index is the synchronous unlink phase, and the
//! memory itself is released only when the last outstanding clone goes away,
//! so concurrent readers that obtained their reference before the unlink are
//! always safe.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use tokio::runtime::Handle;
use tracing::{debug, info, trace};

use hottrack_core::{
    clock::{Clock, MonotonicClock},
    config::{TrackerConfig, Tunables},
    error::TrackError,
    freq::AccessKind,
    readout::HeatInfo,
    temperature::{bucket_of, temperature},
};

use crate::{
    item::{find_covering, InodeItem, RangeItem, RANGE_BITS, RANGE_LEN},
    map::TempMap,
    worker::{self, AgingWorker},
};

/// How many inode items one aging batch pins at a time.
const AGING_BATCH: usize = 64;

/// The two tracked item kinds, for map diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Inode,
    Range,
}

/// What `record_io` needs to know about the file being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDesc {
    pub ino: u64,
    /// Only regular files are tracked.
    pub regular: bool,
    /// Remaining link count; 0 means the file is already deleted.
    pub nlink: u32,
}

impl FileDesc {
    /// Descriptor for a live regular file.
    pub fn regular(ino: u64) -> Self {
        Self {
            ino,
            regular: true,
            nlink: 1,
        }
    }
}

/// The inode index and the inode-kind buckets, guarded by one lock.
pub(crate) struct InodeIndex {
    pub(crate) tree: BTreeMap<u64, Arc<InodeItem>>,
    pub(crate) map: TempMap<InodeItem>,
}

impl InodeIndex {
    fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
            map: TempMap::new(),
        }
    }
}

/// Per-volume hot-data tracking state.
pub struct Tracker {
    pub(crate) inodes: Mutex<InodeIndex>,
    pub(crate) range_map: Mutex<TempMap<RangeItem>>,
    pub(crate) item_count: AtomicU64,
    pub(crate) mem_usage: AtomicU64,
    pub(crate) tunables: Tunables,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) enabled: AtomicBool,
    pub(crate) worker: Mutex<Option<AgingWorker>>,
}

impl Tracker {
    /// Turns on tracking for a volume and arms the aging worker.
    ///
    /// Must be called from within a tokio runtime; the worker task lives on
    /// it until [`teardown`](Tracker::teardown).
    pub fn init(config: TrackerConfig) -> Result<Arc<Self>, TrackError> {
        Self::init_with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// [`init`](Tracker::init) with an injected time source.
    pub fn init_with_clock(
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, TrackError> {
        config.validate()?;
        let handle = Handle::try_current().map_err(|_| TrackError::NoRuntime)?;

        let tracker = Arc::new(Self {
            inodes: Mutex::new(InodeIndex::new()),
            range_map: Mutex::new(TempMap::new()),
            item_count: AtomicU64::new(0),
            mem_usage: AtomicU64::new(0),
            tunables: Tunables::new(&config),
            clock,
            enabled: AtomicBool::new(true),
            worker: Mutex::new(None),
        });

        *tracker.worker.lock().unwrap() = Some(worker::spawn(&tracker, &handle));
        info!(
            update_interval_secs = tracker.tunables.update_interval_secs(),
            memory_high_threshold_mib = tracker.tunables.memory_high_threshold_mib(),
            "hot data tracking enabled"
        );
        Ok(tracker)
    }

    /// Disables tracking, joins the aging worker, and drops every remaining
    /// item.
    ///
    /// Callers must have quiesced I/O on the volume and must not hold item
    /// references across the call; any reference still out keeps only that
    /// item's memory alive, never the index.
    pub async fn teardown(&self) {
        self.enabled.store(false, Ordering::Release);

        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            worker.shutdown().await;
        }

        let mut idx = self.inodes.lock().unwrap();
        let items: Vec<Arc<InodeItem>> = idx.tree.values().cloned().collect();
        for item in &items {
            self.unlink_inode_item_locked(&mut idx, item);
        }
        drop(idx);

        info!("hot data tracking disabled");
    }

    /// Folds one I/O access into the statistics of the file and of every
    /// range the access touches.
    ///
    /// Never fails: an access the tracker cannot or may not account for is
    /// skipped, and the I/O path proceeds untouched.
    pub fn record_io(&self, file: FileDesc, offset: u64, len: u64, kind: AccessKind) {
        if let Err(reason) = self.try_record_io(file, offset, len, kind) {
            trace!(ino = file.ino, %reason, "i/o not tracked");
        }
    }

    fn try_record_io(
        &self,
        file: FileDesc,
        offset: u64,
        len: u64,
        kind: AccessKind,
    ) -> Result<(), TrackError> {
        if !self.enabled.load(Ordering::Acquire) {
            return Err(TrackError::NotEnabled);
        }
        if !file.regular {
            return Err(TrackError::Invalid("not a regular file"));
        }
        if file.nlink == 0 {
            return Err(TrackError::Invalid("no remaining links"));
        }
        if len == 0 {
            return Err(TrackError::Invalid("zero-length i/o"));
        }

        let inode = self.inode_entry(file.ino);
        inode.freq().record(self.clock.now_ns(), kind);

        // Align on range boundaries so overlapping accesses share items
        let first = offset >> RANGE_BITS;
        let last = offset
            .saturating_add(len)
            .saturating_add(RANGE_LEN - 1)
            >> RANGE_BITS;
        for key in first..last {
            // a None owner is being unlinked under us; the file is going away
            let Some(range) = self.range_entry(&inode, key << RANGE_BITS) else {
                break;
            };
            range.freq().record(self.clock.now_ns(), kind);
        }
        Ok(())
    }

    /// Forgets a deleted inode. Silently a no-op if it was never tracked
    /// (or has already been forgotten, so the call is idempotent).
    pub fn unlink_inode(&self, ino: u64) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        let Ok(item) = self.lookup_inode(ino) else {
            return;
        };
        self.drop_index_reference(&item);
        // the caller-side reference in `item` goes away here; whoever still
        // holds a clone keeps the memory alive until they drop it
    }

    /// The tracking item for `ino`, with a reference. Dropping the returned
    /// `Arc` is the matching put.
    pub fn lookup_inode(&self, ino: u64) -> Result<Arc<InodeItem>, TrackError> {
        let idx = self.inodes.lock().unwrap();
        idx.tree.get(&ino).cloned().ok_or(TrackError::NotFound)
    }

    /// Diagnostic heat readout for a file.
    pub fn inode_heat(&self, ino: u64) -> Result<HeatInfo, TrackError> {
        let item = self.lookup_inode(ino)?;
        let temp = temperature(item.freq(), self.clock.now_ns());
        Ok(HeatInfo::from_snapshot(&item.freq().snapshot(), temp))
    }

    /// Diagnostic heat readout for the range covering `offset`.
    pub fn range_heat(&self, ino: u64, offset: u64) -> Result<HeatInfo, TrackError> {
        let item = self.lookup_inode(ino)?;
        let range = item.range_at(offset).ok_or(TrackError::NotFound)?;
        let temp = temperature(range.freq(), self.clock.now_ns());
        Ok(HeatInfo::from_snapshot(&range.freq().snapshot(), temp))
    }

    /// Number of live tracking items (inodes and ranges).
    pub fn item_count(&self) -> u64 {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Notional bytes of all live tracking items.
    pub fn mem_usage_bytes(&self) -> u64 {
        self.mem_usage.load(Ordering::Relaxed)
    }

    /// Inode numbers currently tracked, in key order.
    pub fn tracked_inodes(&self) -> Vec<u64> {
        self.inodes.lock().unwrap().tree.keys().copied().collect()
    }

    /// The runtime-adjustable knobs.
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Occupancy of one temperature bucket.
    pub fn bucket_len(&self, kind: ItemKind, bucket: usize) -> usize {
        match kind {
            ItemKind::Inode => self.inodes.lock().unwrap().map.bucket_len(bucket),
            ItemKind::Range => self.range_map.lock().unwrap().bucket_len(bucket),
        }
    }

    /// One aging pass: evict down to the configured memory budget, then
    /// recompute every item's temperature and rebucket the movers.
    ///
    /// This is what the aging worker runs periodically; it is public so
    /// hosts and tests can force a pass.
    pub fn aging_tick(&self) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        self.evict_to_threshold();

        // Walk the index in key order, pinning a bounded batch at a time so
        // eviction and unlink never stall behind a full scan.
        let mut cursor: u64 = 0;
        let mut visited = 0usize;
        loop {
            let batch: Vec<Arc<InodeItem>> = {
                let idx = self.inodes.lock().unwrap();
                idx.tree
                    .range(cursor..)
                    .take(AGING_BATCH)
                    .map(|(_, item)| Arc::clone(item))
                    .collect()
            };
            let Some(tail) = batch.last() else {
                break;
            };
            let next_cursor = tail.ino().checked_add(1);

            for item in &batch {
                self.rebucket_inode(item);
                for range in item.ranges_snapshot() {
                    self.rebucket_range(&range);
                }
            }
            visited += batch.len();

            if batch.len() < AGING_BATCH {
                break;
            }
            match next_cursor {
                Some(next) => cursor = next,
                None => break,
            }
            std::thread::yield_now();
        }
        debug!(visited, "aging pass complete");
    }

    // ------------------------------------------------------------------
    // Lookup-or-insert
    // ------------------------------------------------------------------

    /// Returns the inode item for `ino`, inserting a fresh one if needed.
    ///
    /// Allocation happens outside the index lock: walk, miss, allocate,
    /// re-walk. Losing the race to a concurrent inserter drops the candidate
    /// and reverses its accounting.
    fn inode_entry(&self, ino: u64) -> Arc<InodeItem> {
        let mut candidate: Option<Arc<InodeItem>> = None;
        loop {
            {
                let mut idx = self.inodes.lock().unwrap();
                if let Some(existing) = idx.tree.get(&ino) {
                    let existing = Arc::clone(existing);
                    drop(idx);
                    if candidate.take().is_some() {
                        self.uncharge(InodeItem::footprint());
                    }
                    return existing;
                }
                if let Some(item) = candidate.take() {
                    idx.tree.insert(ino, Arc::clone(&item));
                    let temp = temperature(item.freq(), self.clock.now_ns());
                    item.freq().set_last_temp(temp);
                    idx.map.attach(item.map_link(), bucket_of(temp), &item);
                    return item;
                }
            }
            candidate = Some(Arc::new(InodeItem::new(ino)));
            self.charge(InodeItem::footprint());
            std::thread::yield_now();
        }
    }

    /// Returns the range item of `inode` covering `start`, inserting a fresh
    /// one if needed. Same discipline as [`inode_entry`](Self::inode_entry).
    ///
    /// Returns `None` when the owner has already been unlinked: its range
    /// teardown has run (or is waiting on the range lock right behind us),
    /// and a late insert would never be torn down.
    fn range_entry(&self, inode: &Arc<InodeItem>, start: u64) -> Option<Arc<RangeItem>> {
        let mut candidate: Option<Arc<RangeItem>> = None;
        loop {
            {
                let mut ranges = inode.ranges().lock().unwrap();
                if !inode.map_link().is_attached() {
                    drop(ranges);
                    if candidate.take().is_some() {
                        self.uncharge(RangeItem::footprint());
                    }
                    return None;
                }
                if let Some(existing) = find_covering(&ranges, start) {
                    drop(ranges);
                    if candidate.take().is_some() {
                        self.uncharge(RangeItem::footprint());
                    }
                    return Some(existing);
                }
                if let Some(item) = candidate.take() {
                    ranges.insert(start, Arc::clone(&item));
                    let temp = temperature(item.freq(), self.clock.now_ns());
                    item.freq().set_last_temp(temp);
                    self.range_map
                        .lock()
                        .unwrap()
                        .attach(item.map_link(), bucket_of(temp), &item);
                    return Some(item);
                }
            }
            candidate = Some(Arc::new(RangeItem::new(inode.ino(), start)));
            self.charge(RangeItem::footprint());
            std::thread::yield_now();
        }
    }

    // ------------------------------------------------------------------
    // Unlink and teardown
    // ------------------------------------------------------------------

    /// Drops the index's reference to `item`, unless another thread got
    /// there first (or the key has since been taken by a new item).
    fn drop_index_reference(&self, item: &Arc<InodeItem>) {
        let mut idx = self.inodes.lock().unwrap();
        match idx.tree.get(&item.ino()) {
            Some(current) if Arc::ptr_eq(current, item) => {}
            _ => return,
        }
        self.unlink_inode_item_locked(&mut idx, item);
    }

    /// Synchronous unlink phase: removes `item` from the index and its
    /// bucket, tears down its ranges, reverses the accounting. The caller
    /// holds the index lock.
    pub(crate) fn unlink_inode_item_locked(&self, idx: &mut InodeIndex, item: &Arc<InodeItem>) {
        idx.tree.remove(&item.ino());
        idx.map.detach(item.map_link());
        self.teardown_ranges(item);
        self.uncharge(InodeItem::footprint());
    }

    /// Unlinks every range of `item`; part of the inode unlink cascade.
    fn teardown_ranges(&self, item: &Arc<InodeItem>) {
        let mut ranges = item.ranges().lock().unwrap();
        let mut map = self.range_map.lock().unwrap();
        for (_, range) in std::mem::take(&mut *ranges) {
            map.detach(range.map_link());
            self.uncharge(RangeItem::footprint());
        }
    }

    // ------------------------------------------------------------------
    // Rebucketing
    // ------------------------------------------------------------------

    /// Moves `item` to the bucket of its current temperature if that differs
    /// from the bucket recorded at the last move. Detached items are left
    /// alone.
    fn rebucket_inode(&self, item: &Arc<InodeItem>) {
        let temp = temperature(item.freq(), self.clock.now_ns());
        if bucket_of(temp) == bucket_of(item.freq().last_temp()) {
            return;
        }
        let mut idx = self.inodes.lock().unwrap();
        if idx.map.move_to_tail(item.map_link(), bucket_of(temp), item) {
            item.freq().set_last_temp(temp);
        }
    }

    fn rebucket_range(&self, item: &Arc<RangeItem>) {
        let temp = temperature(item.freq(), self.clock.now_ns());
        if bucket_of(temp) == bucket_of(item.freq().last_temp()) {
            return;
        }
        let mut map = self.range_map.lock().unwrap();
        if map.move_to_tail(item.map_link(), bucket_of(temp), item) {
            item.freq().set_last_temp(temp);
        }
    }

    // ------------------------------------------------------------------
    // Accounting
    // ------------------------------------------------------------------

    pub(crate) fn charge(&self, bytes: u64) {
        self.item_count.fetch_add(1, Ordering::Relaxed);
        self.mem_usage.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn uncharge(&self, bytes: u64) {
        self.item_count.fetch_sub(1, Ordering::Relaxed);
        self.mem_usage.fetch_sub(bytes, Ordering::Relaxed);
    }
}

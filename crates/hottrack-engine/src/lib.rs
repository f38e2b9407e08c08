//! HOTTRACK Engine - the concurrent hot-data tracking data plane
//!
//! Instantiated once per mounted volume, a [`Tracker`] maintains access
//! statistics for every regular file (and 1 MiB range within it) touched by
//! I/O, derives a temperature from them, and keeps all items bucketed by
//! temperature so a storage back-end can tell hot data from cold:
//!
//! - [`tracker`] - the tracker root, indices and host-facing API
//! - [`item`] - per-inode and per-range tracking items
//! - [`shrinker`] - the hook the host's memory-pressure loop drives
//!
//! The aging worker, temperature map and eviction internals live in private
//! modules behind the `Tracker` API.

pub mod item;
pub mod shrinker;
pub mod tracker;

mod evict;
mod map;
mod worker;

pub use shrinker::{ShrinkControl, ShrinkOutcome, Shrinker};
pub use tracker::{FileDesc, ItemKind, Tracker};

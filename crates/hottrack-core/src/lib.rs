//! HOTTRACK Core - Domain types for hot-data tracking
//!
//! This crate contains the pure domain layer shared by the tracking engine:
//! - **Access statistics** - [`freq::AccessFreq`], the per-item frequency record
//! - **Temperature** - the function distilling a frequency record into a scalar heat value
//! - **Clock** - the monotonic nanosecond time source the tracker consumes
//! - **Configuration** - typed config with runtime-adjustable tunables
//! - **Readout** - the ABI-stable per-item diagnostic struct
//!
//! No concurrency policy lives here beyond the atomics inside `AccessFreq`;
//! locking, indices and lifecycle belong to `hottrack-engine`.

pub mod clock;
pub mod config;
pub mod error;
pub mod freq;
pub mod readout;
pub mod temperature;

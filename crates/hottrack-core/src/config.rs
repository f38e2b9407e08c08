//! Configuration for the tracker.
//!
//! Provides the typed, serde-backed [`TrackerConfig`] (loading, validation,
//! defaults) and the runtime-adjustable [`Tunables`] derived from it. The
//! tunables are plain atomically-loaded integers that the hot paths re-read
//! at use time, so an adjustment takes effect on the next pass with no
//! listener plumbing.

use std::{
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Aging-worker period when not configured otherwise, in seconds.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 150;

/// Tracker settings as read from a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Soft memory budget in MiB. When live tracking items exceed it, the
    /// aging worker evicts the coldest items down to the budget.
    /// 0 disables internal eviction.
    pub memory_high_threshold_mib: u64,
    /// Seconds between aging passes (temperature recompute + rebucketing).
    pub update_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            memory_high_threshold_mib: 0,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
        }
    }
}

impl TrackerConfig {
    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, TrackError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings for values the tracker cannot run with.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.update_interval_secs == 0 {
            return Err(TrackError::Config(
                "update_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The two runtime-adjustable knobs, shared with the hot paths.
///
/// Readers load the current value every time they need it; nothing is cached.
#[derive(Debug)]
pub struct Tunables {
    memory_high_threshold_mib: AtomicU64,
    update_interval_secs: AtomicU64,
}

impl Tunables {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            memory_high_threshold_mib: AtomicU64::new(config.memory_high_threshold_mib),
            update_interval_secs: AtomicU64::new(config.update_interval_secs.max(1)),
        }
    }

    pub fn memory_high_threshold_mib(&self) -> u64 {
        self.memory_high_threshold_mib.load(Ordering::Relaxed)
    }

    /// Adjusts the soft memory budget; 0 disables internal eviction.
    pub fn set_memory_high_threshold_mib(&self, mib: u64) {
        self.memory_high_threshold_mib.store(mib, Ordering::Relaxed);
    }

    pub fn update_interval_secs(&self) -> u64 {
        self.update_interval_secs.load(Ordering::Relaxed)
    }

    /// Adjusts the aging period; takes effect when the worker next re-arms.
    pub fn set_update_interval_secs(&self, secs: u64) {
        self.update_interval_secs.store(secs.max(1), Ordering::Relaxed);
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.memory_high_threshold_mib, 0);
        assert_eq!(config.update_interval_secs, 150);
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = TrackerConfig {
            update_interval_secs: 0,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(TrackError::Config(_))));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "memory_high_threshold_mib: 64").expect("Failed to write config");
        writeln!(file, "update_interval_secs: 30").expect("Failed to write config");

        let config = TrackerConfig::load(file.path()).expect("Failed to load config");
        assert_eq!(config.memory_high_threshold_mib, 64);
        assert_eq!(config.update_interval_secs, 30);
    }

    #[test]
    fn test_load_applies_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "memory_high_threshold_mib: 8").expect("Failed to write config");

        let config = TrackerConfig::load(file.path()).expect("Failed to load config");
        assert_eq!(config.memory_high_threshold_mib, 8);
        assert_eq!(config.update_interval_secs, DEFAULT_UPDATE_INTERVAL_SECS);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "update_interval_secs: 0").expect("Failed to write config");

        assert!(TrackerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_tunables_read_current_value() {
        let tunables = Tunables::default();
        assert_eq!(tunables.memory_high_threshold_mib(), 0);
        assert_eq!(tunables.update_interval_secs(), 150);

        tunables.set_memory_high_threshold_mib(256);
        tunables.set_update_interval_secs(10);
        assert_eq!(tunables.memory_high_threshold_mib(), 256);
        assert_eq!(tunables.update_interval_secs(), 10);
    }

    #[test]
    fn test_tunables_floor_interval_at_one() {
        let tunables = Tunables::default();
        tunables.set_update_interval_secs(0);
        assert_eq!(tunables.update_interval_secs(), 1);
    }
}

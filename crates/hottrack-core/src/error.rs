//! Error types for hot-data tracking.
//!
//! All errors are local and non-fatal: the tracker never propagates a failure
//! into the I/O path that fed it.

use thiserror::Error;

/// Errors surfaced by the tracker.
#[derive(Error, Debug)]
pub enum TrackError {
    /// An allocation was reported as failed by a fallible-allocation host.
    #[error("out of memory")]
    OutOfMemory,

    /// No tracking item exists for the requested key.
    #[error("no tracking item for key")]
    NotFound,

    /// Tracking is not enabled (or has been torn down) on this volume.
    #[error("tracking not enabled")]
    NotEnabled,

    /// The request cannot be tracked (non-regular file, zero-length I/O, ...).
    #[error("invalid request: {0}")]
    Invalid(&'static str),

    /// The tracker was initialised outside a tokio runtime.
    #[error("no tokio runtime available for the aging worker")]
    NoRuntime,

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for TrackError {
    fn from(err: std::io::Error) -> Self {
        TrackError::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for TrackError {
    fn from(err: serde_yaml::Error) -> Self {
        TrackError::Config(err.to_string())
    }
}

use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading the station catalog. All of these are fatal at
/// startup: the application never builds a UI over an unusable catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read station file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed station file")]
    Parse(#[from] serde_json::Error),
    #[error("station file contains no usable stations")]
    NoStations,
}

/// Failures of the tuning cursor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TunerError {
    #[error("catalog has no stations")]
    EmptyCatalog,
    #[error("station index {index} out of range (catalog has {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Runtime playback failures. These are caught at the facade boundary and
/// rendered as a status, never propagated as process-terminating errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("playback engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("could not open stream: {0}")]
    StreamOpen(String),
    #[error("volume {0} outside 0..=100")]
    InvalidVolume(u8),
}

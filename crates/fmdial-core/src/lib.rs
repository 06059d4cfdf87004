//! Core library for fmdial: station catalog, tuning cursor, and the playback
//! facade that fronts the external engine. Everything UI-independent lives
//! here so the facade can be exercised against a fake engine in tests.

pub mod catalog;
pub mod config;
pub mod error;
pub mod platform;
pub mod playback;
pub mod tuner;

pub use catalog::{Catalog, Station};
pub use error::{CatalogError, PlaybackError, TunerError};
pub use playback::{Engine, PlaybackStatus, Player, StatusCell};
pub use tuner::Tuner;

//! Configuration module
//!
//! This module contains the service configuration structures and path management.

mod paths;
pub(crate) mod settings;

pub use paths::Paths;
pub use settings::{AppConfig, EmbeddingBackend};

/// Entries returned by the trend listing
pub const TREND_LISTING_LIMIT: i64 = 20;

/// Bounds every style clustering run stays within
pub const MIN_STYLE_CLUSTERS: usize = 2;
pub const MAX_STYLE_CLUSTERS: usize = 10;

//! Data models for the palette service
//!
//! Catalogue records, palette responses and recommendation entries.

mod design;
pub mod palette;
mod recommendation;
mod trend;

pub use design::DesignItem;
pub use recommendation::Recommendation;
pub use trend::TrendItem;

//! Database table operations

mod design_table;
mod trend_table;

pub use design_table::DesignTable;
pub use trend_table::TrendTable;

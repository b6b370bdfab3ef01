//! Database module
//!
//! Catalogue storage using SQLx with SQLite.

mod engine;
pub mod tables;

pub use engine::DbEngine;
pub use tables::*;

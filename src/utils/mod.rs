//! Utility modules

pub mod network;

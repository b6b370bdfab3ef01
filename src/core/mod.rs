//! Core library functions for the palette service

pub mod analysis;
pub mod base_color;
pub mod clustering;
pub mod colorlib;
pub mod embeddings;
pub mod extractor;
pub mod harmony;
pub mod import;
pub mod jobs;
pub mod kmeans;
pub mod recommender;
pub mod scaler;

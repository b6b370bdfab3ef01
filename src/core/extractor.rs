//! Dominant color extraction
//!
//! Images are fetched, resized to a fixed square, stripped of alpha and
//! clustered in RGB space with a seeded k-means so repeated runs on the same
//! image give the same centers.

use image::imageops::FilterType;
use kmeans_colors::get_kmeans;
use palette::Srgb;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::colorlib::Rgb;
use crate::utils::network::{FetchError, ImageSource};

/// One dominant color and the number of pixels assigned to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorCluster {
    pub center: Rgb,
    pub weight: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image has no usable color signal")]
    NoColors,
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Tuning for pixel clustering
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Side of the canonical square
    pub image_size: u32,
    pub max_iter: usize,
    pub converge: f32,
    pub seed: u64,
}

impl ExtractorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_size: config.image_size,
            max_iter: config.kmeans_max_iter,
            converge: config.color_converge,
            seed: config.kmeans_seed,
        }
    }
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Fetches images and reduces them to weighted color clusters
pub struct ColorExtractor {
    source: Arc<dyn ImageSource>,
    options: ExtractorOptions,
}

impl ColorExtractor {
    pub fn new(source: Arc<dyn ImageSource>, options: ExtractorOptions) -> Self {
        Self { source, options }
    }

    /// Download `url` and extract up to `n_colors` clusters
    pub async fn extract(&self, url: &str, n_colors: usize) -> Result<Vec<ColorCluster>, ExtractError> {
        let data = self.source.fetch(url).await?;
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || extract_from_bytes(&data, n_colors, &options)).await?
    }
}

/// Decode image bytes and extract up to `n_colors` clusters
pub fn extract_from_bytes(
    data: &[u8],
    n_colors: usize,
    options: &ExtractorOptions,
) -> Result<Vec<ColorCluster>, ExtractError> {
    let img = image::load_from_memory(data)?;

    // nearest-neighbour sampling never invents blended colors
    let rgb = img
        .resize_exact(options.image_size, options.image_size, FilterType::Nearest)
        .to_rgb8();

    let pixels: Vec<[u8; 3]> = rgb.pixels().map(|p| p.0).collect();

    cluster_pixels(&pixels, n_colors, options)
}

/// Cluster raw pixels into `min(n_colors, distinct colors)` groups
pub fn cluster_pixels(
    pixels: &[[u8; 3]],
    n_colors: usize,
    options: &ExtractorOptions,
) -> Result<Vec<ColorCluster>, ExtractError> {
    let distinct: HashSet<[u8; 3]> = pixels.iter().copied().collect();

    // indices are stored as u8 by the clustering backend
    let k = n_colors.min(distinct.len()).min(u8::MAX as usize);
    if k == 0 {
        return Err(ExtractError::NoColors);
    }

    let buffer: Vec<Srgb<f32>> = pixels
        .iter()
        .map(|p| Srgb::new(p[0], p[1], p[2]).into_format())
        .collect();

    let result = get_kmeans(
        k,
        options.max_iter,
        options.converge,
        false,
        &buffer,
        options.seed,
    );

    let mut weights = vec![0u64; result.centroids.len()];
    for &index in &result.indices {
        if let Some(weight) = weights.get_mut(index as usize) {
            *weight += 1;
        }
    }

    let clusters = result
        .centroids
        .iter()
        .zip(weights)
        .map(|(c, weight)| ColorCluster {
            center: Rgb::new(
                c.red as f64 * 255.0,
                c.green as f64 * 255.0,
                c.blue as f64 * 255.0,
            ),
            weight,
        })
        .collect();

    Ok(clusters)
}

/// Clusters ordered heaviest first, ties keep extraction order
pub fn sorted_by_weight(clusters: &[ColorCluster]) -> Vec<ColorCluster> {
    let mut sorted = clusters.to_vec();
    sorted.sort_by(|a, b| b.weight.cmp(&a.weight));
    sorted
}

/// Centers ordered by weight and flattened to exactly `n_colors * 3` values.
///
/// Images with fewer distinct colors than requested repeat the dominant
/// center so every item yields a vector of the same length.
pub fn feature_vector(clusters: &[ColorCluster], n_colors: usize) -> Option<Vec<f64>> {
    let sorted = sorted_by_weight(clusters);
    let dominant = sorted.first()?.center;

    let mut features = Vec::with_capacity(n_colors * 3);
    for i in 0..n_colors {
        let center = sorted.get(i).map(|c| c.center).unwrap_or(dominant);
        features.extend_from_slice(&center.channels());
    }

    Some(features)
}

//! Interactive color analysis
//!
//! Extracts the dominant colors of one image, picks (or accepts) an anchor and
//! derives the harmony palettes from it.

use std::sync::Arc;

use crate::core::base_color::resolve_anchor;
use crate::core::colorlib::{ColorLib, Rgb};
use crate::core::extractor::{sorted_by_weight, ColorCluster, ColorExtractor, ExtractError};
use crate::core::harmony::generate_palettes;
use crate::models::palette::PaletteAnalysis;

pub struct ColorAnalyzer {
    extractor: Arc<ColorExtractor>,
    n_colors: usize,
}

impl ColorAnalyzer {
    pub fn new(extractor: Arc<ColorExtractor>, n_colors: usize) -> Self {
        Self {
            extractor,
            n_colors,
        }
    }

    /// Analyze the image at `url`, anchoring on `base_color` when given
    pub async fn analyze(
        &self,
        url: &str,
        base_color: Option<Rgb>,
    ) -> Result<PaletteAnalysis, ExtractError> {
        let clusters = self.extractor.extract(url, self.n_colors).await?;
        tracing::debug!("Extracted {} clusters from {}", clusters.len(), url);

        build_analysis(&clusters, base_color)
    }
}

/// Assemble the response from already extracted clusters
pub fn build_analysis(
    clusters: &[ColorCluster],
    base_color: Option<Rgb>,
) -> Result<PaletteAnalysis, ExtractError> {
    let anchor = resolve_anchor(base_color, clusters).ok_or(ExtractError::NoColors)?;

    let dominant_palette = sorted_by_weight(clusters)
        .iter()
        .map(|c| ColorLib::rgb_to_hex(c.center))
        .collect();

    Ok(PaletteAnalysis {
        dominant_palette,
        suggested_palettes: generate_palettes(anchor),
        base_color: ColorLib::rgb_to_hex(anchor),
    })
}

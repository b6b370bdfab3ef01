//! Anchor color selection
//!
//! Scores every cluster by dominance and vibrancy and keeps the best one.
//! Saturated, mid-lightness, dominant clusters win over pale or minor ones.

use crate::core::colorlib::{HslColor, Rgb};
use crate::core::extractor::ColorCluster;

/// Saturation below which a cluster counts as near-gray
pub const NEUTRAL_SATURATION: f64 = 0.08;
/// Multiplier applied to near-gray clusters
pub const NEUTRAL_PENALTY: f64 = 0.3;
/// Share of the total weight below which a cluster counts as minor
pub const MINOR_SHARE: f64 = 0.02;
/// Multiplier applied to minor clusters
pub const MINOR_PENALTY: f64 = 0.6;

/// Vibrancy/dominance score of one cluster given the total weight
pub fn score_cluster(cluster: &ColorCluster, total_weight: f64) -> f64 {
    let fraction = cluster.weight as f64 / total_weight;
    let hsl = HslColor::from_rgb(cluster.center);
    let chroma = cluster.center.chroma();
    let mid_light = (1.0 - (0.5 - hsl.lightness).abs() * 2.0).max(0.0);

    let mut score = fraction * chroma * (hsl.saturation + 0.02) * mid_light;

    if hsl.saturation < NEUTRAL_SATURATION {
        score *= NEUTRAL_PENALTY;
    }

    if (cluster.weight as f64) < (total_weight * MINOR_SHARE).max(1.0) {
        score *= MINOR_PENALTY;
    }

    score
}

/// Center of the highest-scoring cluster, first index wins ties
pub fn pick_base_color(clusters: &[ColorCluster]) -> Option<Rgb> {
    let total: u64 = clusters.iter().map(|c| c.weight).sum();
    let total = if total > 0 { total as f64 } else { 1.0 };

    let mut best: Option<(f64, Rgb)> = None;
    for cluster in clusters {
        let score = score_cluster(cluster, total);
        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, cluster.center));
        }
    }

    best.map(|(_, center)| center)
}

/// Caller-supplied anchor when present, otherwise the scored pick
pub fn resolve_anchor(supplied: Option<Rgb>, clusters: &[ColorCluster]) -> Option<Rgb> {
    match supplied {
        Some(anchor) => Some(anchor),
        None => pick_base_color(clusters),
    }
}

//! Hybrid style clustering
//!
//! Every catalogue design with an image and a prompt is described by its
//! standardized dominant colors joined with a sentence embedding of its prompt.
//! The fused vectors are clustered and the labels written back as style ids.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{AppConfig, MAX_STYLE_CLUSTERS, MIN_STYLE_CLUSTERS};
use crate::core::embeddings::SentenceEmbedder;
use crate::core::extractor::{feature_vector, ColorExtractor};
use crate::core::kmeans::{self, KMeansOptions};
use crate::core::scaler::StandardScaler;
use crate::db::{DbEngine, DesignTable};

/// Why a run stopped before writing labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum ClusterAbort {
    #[error("no color features could be extracted")]
    NoFeatures,
    #[error("{items} items are not enough for {clusters} clusters")]
    #[serde(rename_all = "camelCase")]
    TooFewItems { items: usize, clusters: usize },
}

/// Result of one clustering run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ClusterOutcome {
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Designs that had both an image and a prompt
        candidates: usize,
        /// Designs whose features were extracted and labelled
        clustered: usize,
        clusters: usize,
    },
    Aborted(ClusterAbort),
}

/// Clusters wanted for `items` vectors: half of them, held within the
/// configured bounds and never outside 2..=10
fn requested_clusters(items: usize, min: usize, max: usize) -> usize {
    let min = min.clamp(MIN_STYLE_CLUSTERS, MAX_STYLE_CLUSTERS);
    let max = max.clamp(min, MAX_STYLE_CLUSTERS);
    items.div_ceil(2).clamp(min, max)
}

/// Style cluster count for `items` feature vectors, `None` when too few
pub fn style_cluster_count(items: usize, min: usize, max: usize) -> Option<usize> {
    let k = requested_clusters(items, min, max);
    if items < k {
        return None;
    }

    Some(k)
}

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub n_colors: usize,
    pub min_clusters: usize,
    pub max_clusters: usize,
    pub kmeans: KMeansOptions,
}

impl ClusterOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            n_colors: config.batch_colors,
            min_clusters: config.min_style_clusters,
            max_clusters: config.max_style_clusters,
            kmeans: KMeansOptions {
                max_iter: config.kmeans_max_iter,
                seed: config.kmeans_seed,
                runs: config.kmeans_runs,
                ..KMeansOptions::default()
            },
        }
    }
}

pub struct StyleClusterer {
    db: DbEngine,
    extractor: Arc<ColorExtractor>,
    embedder: Arc<dyn SentenceEmbedder>,
    config: Arc<AppConfig>,
    options: ClusterOptions,
}

impl StyleClusterer {
    pub fn new(
        db: DbEngine,
        extractor: Arc<ColorExtractor>,
        embedder: Arc<dyn SentenceEmbedder>,
        config: Arc<AppConfig>,
    ) -> Self {
        let options = ClusterOptions::from_config(&config);
        Self {
            db,
            extractor,
            embedder,
            config,
            options,
        }
    }

    /// Recompute and store the style label of every eligible design
    pub async fn run(&self) -> Result<ClusterOutcome> {
        let designs = DesignTable::all(&self.db).await?;
        let total = designs.len();
        tracing::info!("Clustering: found {} designs", total);

        let mut ids = Vec::new();
        let mut prompts = Vec::new();
        let mut color_features = Vec::new();
        let mut candidates = 0;

        for (i, design) in designs.iter().enumerate() {
            let Some((image, prompt)) = design.clustering_inputs() else {
                continue;
            };
            candidates += 1;

            tracing::debug!("Processing image {} of {} ({})", i + 1, total, design.id);

            let url = self.config.rewrite_image_url(image);
            let clusters = match self.extractor.extract(&url, self.options.n_colors).await {
                Ok(clusters) => clusters,
                Err(e) => {
                    tracing::warn!("Skipping design {}: {}", design.id, e);
                    continue;
                }
            };

            let Some(features) = feature_vector(&clusters, self.options.n_colors) else {
                continue;
            };

            ids.push(design.id.clone());
            prompts.push(prompt.to_string());
            color_features.push(features);
        }

        if color_features.is_empty() {
            tracing::info!("Clustering: no features extracted, nothing to do");
            return Ok(ClusterOutcome::Aborted(ClusterAbort::NoFeatures));
        }

        let items = color_features.len();
        tracing::info!("Clustering: extracted features for {} items", items);

        let Some(k) =
            style_cluster_count(items, self.options.min_clusters, self.options.max_clusters)
        else {
            let clusters =
                requested_clusters(items, self.options.min_clusters, self.options.max_clusters);
            tracing::info!("Clustering: not enough samples ({}) for {} clusters", items, clusters);
            return Ok(ClusterOutcome::Aborted(ClusterAbort::TooFewItems {
                items,
                clusters,
            }));
        };

        let scaled = StandardScaler::fit_transform(&color_features)
            .ok_or_else(|| anyhow!("color features have inconsistent lengths"))?;

        let embedder = Arc::clone(&self.embedder);
        let embeddings = tokio::task::spawn_blocking(move || embedder.embed_batch(&prompts))
            .await
            .context("embedding task panicked")??;

        if embeddings.len() != items {
            return Err(anyhow!(
                "embedder returned {} vectors for {} prompts",
                embeddings.len(),
                items
            ));
        }

        let fused = fuse(scaled, embeddings);

        tracing::info!("Clustering: running k-means with {} clusters", k);
        let kmeans_options = self.options.kmeans.clone();
        let fit = tokio::task::spawn_blocking(move || kmeans::fit(&fused, k, &kmeans_options))
            .await
            .context("k-means task panicked")??;
        tracing::debug!(
            "k-means finished after {} iterations, inertia {:.4}",
            fit.iterations,
            fit.inertia
        );

        let labels: Vec<(String, i64)> = ids
            .into_iter()
            .zip(fit.labels)
            .map(|(id, label)| (id, label as i64))
            .collect();

        let written = DesignTable::apply_style_labels(&self.db, &labels).await?;
        tracing::info!("Clustering: wrote {} style labels", written);

        Ok(ClusterOutcome::Completed {
            candidates,
            clustered: items,
            clusters: k,
        })
    }
}

/// Concatenate standardized color features with prompt embeddings per row
fn fuse(colors: Vec<Vec<f64>>, embeddings: Vec<Vec<f32>>) -> Vec<Vec<f64>> {
    colors
        .into_iter()
        .zip(embeddings)
        .map(|(mut row, embedding)| {
            row.extend(embedding.into_iter().map(f64::from));
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::embeddings::HashingEmbedder;
    use crate::core::extractor::test_images::two_tone_png;
    use crate::core::extractor::ExtractorOptions;
    use crate::models::DesignItem;
    use crate::utils::network::testing::StaticImageSource;

    const RED: [u8; 3] = [220, 30, 30];
    const BLUE: [u8; 3] = [30, 40, 210];
    const WHITE: [u8; 3] = [250, 250, 250];

    fn design(id: &str, image: Option<&str>, prompt: Option<&str>) -> DesignItem {
        DesignItem {
            id: id.into(),
            user_id: "u".into(),
            image: image.map(String::from),
            prompt: prompt.map(String::from),
            style_id: None,
            created_at: 0,
        }
    }

    fn clusterer(db: DbEngine, source: StaticImageSource, config: AppConfig) -> StyleClusterer {
        let extractor = Arc::new(ColorExtractor::new(
            Arc::new(source),
            ExtractorOptions::from_config(&config),
        ));
        StyleClusterer::new(
            db,
            extractor,
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(config),
        )
    }

    #[test]
    fn test_style_cluster_count_bounds() {
        let k = |n| style_cluster_count(n, 2, 10);
        assert_eq!(k(0), None);
        assert_eq!(k(1), None);
        assert_eq!(k(3), Some(2));
        assert_eq!(k(4), Some(2));
        assert_eq!(k(20), Some(10));
        assert_eq!(k(21), Some(10));
        assert_eq!(k(100), Some(10));
    }

    #[test]
    fn test_style_cluster_count_ignores_out_of_range_bounds() {
        let k = |n| style_cluster_count(n, 1, 40);
        assert_eq!(k(1), None);
        assert_eq!(k(2), Some(2));
        assert_eq!(k(100), Some(10));
    }

    #[test]
    fn test_fuse_appends_embedding() {
        let fused = fuse(vec![vec![1.0, 2.0]], vec![vec![0.5]]);
        assert_eq!(fused, vec![vec![1.0, 2.0, 0.5]]);
    }

    #[tokio::test]
    async fn test_run_labels_similar_designs_together() {
        let db = DbEngine::in_memory().await.unwrap();
        let mut source = StaticImageSource::default();

        let items = [
            ("r1", RED, "bold red floral print"),
            ("r2", RED, "bold red floral print"),
            ("b1", BLUE, "calm blue ocean waves"),
            ("b2", BLUE, "calm blue ocean waves"),
        ];
        for (id, color, prompt) in items {
            let url = format!("https://img/{}.png", id);
            source = source.with(&url, two_tone_png(40, 30, color, WHITE));
            DesignTable::upsert(&db, &design(id, Some(&url), Some(prompt)))
                .await
                .unwrap();
        }
        // never clustered: no prompt
        DesignTable::upsert(&db, &design("np", Some("https://img/r1.png"), None))
            .await
            .unwrap();

        let outcome = clusterer(db.clone(), source, AppConfig::default())
            .run()
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClusterOutcome::Completed {
                candidates: 4,
                clustered: 4,
                clusters: 2
            }
        );

        let all = DesignTable::all(&db).await.unwrap();
        let style = |id: &str| all.iter().find(|d| d.id == id).unwrap().style_id;
        assert!(style("r1").is_some());
        assert_eq!(style("r1"), style("r2"));
        assert_eq!(style("b1"), style("b2"));
        assert_ne!(style("r1"), style("b1"));
        assert_eq!(style("np"), None);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_label() {
        let db = DbEngine::in_memory().await.unwrap();
        let mut source = StaticImageSource::default();
        for (id, color) in [("a", RED), ("b", BLUE), ("c", RED)] {
            let url = format!("https://img/{}.png", id);
            source = source.with(&url, two_tone_png(20, 10, color, WHITE));
            DesignTable::upsert(&db, &design(id, Some(&url), Some("pattern")))
                .await
                .unwrap();
        }
        let mut broken = design("gone", Some("https://img/gone.png"), Some("pattern"));
        broken.style_id = Some(7);
        DesignTable::upsert(&db, &broken).await.unwrap();

        let outcome = clusterer(db.clone(), source, AppConfig::default())
            .run()
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ClusterOutcome::Completed { candidates: 4, clustered: 3, clusters: 2 }
        ));

        let all = DesignTable::all(&db).await.unwrap();
        let gone = all.iter().find(|d| d.id == "gone").unwrap();
        assert_eq!(gone.style_id, Some(7));
    }

    #[tokio::test]
    async fn test_single_item_aborts_without_writing() {
        let db = DbEngine::in_memory().await.unwrap();
        let source = StaticImageSource::default()
            .with("https://img/a.png", two_tone_png(20, 10, RED, WHITE));
        let mut only = design("a", Some("https://img/a.png"), Some("pattern"));
        only.style_id = Some(3);
        DesignTable::upsert(&db, &only).await.unwrap();

        let outcome = clusterer(db.clone(), source, AppConfig::default())
            .run()
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClusterOutcome::Aborted(ClusterAbort::TooFewItems {
                items: 1,
                clusters: 2
            })
        );
        assert_eq!(DesignTable::all(&db).await.unwrap()[0].style_id, Some(3));
    }

    #[tokio::test]
    async fn test_empty_catalogue_aborts() {
        let db = DbEngine::in_memory().await.unwrap();
        let outcome = clusterer(db, StaticImageSource::default(), AppConfig::default())
            .run()
            .await
            .unwrap();
        assert_eq!(outcome, ClusterOutcome::Aborted(ClusterAbort::NoFeatures));
    }

    #[tokio::test]
    async fn test_image_urls_are_rewritten_before_fetching() {
        let db = DbEngine::in_memory().await.unwrap();
        let mut source = StaticImageSource::default();
        for id in ["a", "b"] {
            source = source.with(
                &format!("https://eu.store.test/{}.png", id),
                two_tone_png(20, 10, RED, WHITE),
            );
            DesignTable::upsert(
                &db,
                &design(id, Some(&format!("https://store.test/{}.png", id)), Some("p")),
            )
            .await
            .unwrap();
        }

        let mut config = AppConfig::default();
        config.image_host_rewrites = vec![crate::config::settings::HostRewrite {
            from: "store.test".into(),
            to: "eu.store.test".into(),
        }];

        let outcome = clusterer(db, source, config).run().await.unwrap();
        assert!(matches!(outcome, ClusterOutcome::Completed { clustered: 2, .. }));
    }
}

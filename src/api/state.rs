//! Shared application state handed to every route

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::analysis::ColorAnalyzer;
use crate::core::clustering::StyleClusterer;
use crate::core::embeddings::SentenceEmbedder;
use crate::core::extractor::{ColorExtractor, ExtractorOptions};
use crate::core::jobs::ReclusterQueue;
use crate::core::recommender::Recommender;
use crate::db::DbEngine;
use crate::utils::network::ImageSource;

pub struct AppState {
    pub db: DbEngine,
    pub analyzer: ColorAnalyzer,
    pub recommender: Recommender,
    pub recluster: Arc<ReclusterQueue>,
}

impl AppState {
    /// Wire every component once. Starts the recluster worker, so this must
    /// run inside a tokio runtime.
    pub fn new(
        config: Arc<AppConfig>,
        db: DbEngine,
        source: Arc<dyn ImageSource>,
        embedder: Arc<dyn SentenceEmbedder>,
    ) -> Self {
        let extractor = Arc::new(ColorExtractor::new(
            source,
            ExtractorOptions::from_config(&config),
        ));

        let analyzer = ColorAnalyzer::new(Arc::clone(&extractor), config.interactive_colors);
        let recommender = Recommender::from_config(db.clone(), &config);
        let clusterer = StyleClusterer::new(db.clone(), extractor, embedder, Arc::clone(&config));
        let recluster = ReclusterQueue::start(Arc::new(clusterer));

        Self {
            db,
            analyzer,
            recommender,
            recluster,
        }
    }
}

//! Service configuration
//!
//! Settings live in settings.json inside the config directory. Every field has a
//! default and a missing file is written out on first start. A few host-level
//! values can be overridden from `STYLEPALETTE_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{MAX_STYLE_CLUSTERS, MIN_STYLE_CLUSTERS};

/// Which sentence-embedding implementation backs the clustering job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 loaded from a local model directory
    Minilm,
    /// Deterministic token hashing, no model files needed
    Hashing,
}

impl EmbeddingBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "minilm" => Some(EmbeddingBackend::Minilm),
            "hashing" => Some(EmbeddingBackend::Hashing),
            _ => None,
        }
    }
}

/// Host substitution applied to catalogue image URLs before fetching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRewrite {
    pub from: String,
    pub to: String,
}

/// Service configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// SQLite database file, defaults to the config directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Per-request timeout for image downloads
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Retries after the first failed download attempt
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: usize,

    /// Base delay of the exponential retry backoff
    #[serde(default = "default_fetch_backoff_millis")]
    pub fetch_backoff_millis: u64,

    /// Side of the square every image is resized to before clustering
    #[serde(default = "default_image_size")]
    pub image_size: u32,

    /// Colors extracted for interactive analysis
    #[serde(default = "default_interactive_colors")]
    pub interactive_colors: usize,

    /// Colors extracted per catalogue item during clustering
    #[serde(default = "default_batch_colors")]
    pub batch_colors: usize,

    /// Seed shared by every k-means run
    #[serde(default = "default_kmeans_seed")]
    pub kmeans_seed: u64,

    /// Iteration cap for k-means
    #[serde(default = "default_kmeans_max_iter")]
    pub kmeans_max_iter: usize,

    /// Independent initialisations of the style k-means
    #[serde(default = "default_kmeans_runs")]
    pub kmeans_runs: usize,

    /// Convergence threshold for pixel clustering
    #[serde(default = "default_color_converge")]
    pub color_converge: f32,

    /// Sentence-embedding implementation
    #[serde(default = "default_embedding_backend")]
    pub embedding_backend: EmbeddingBackend,

    /// Directory with config.json, tokenizer.json and model.safetensors
    #[serde(default)]
    pub embedding_model_dir: Option<PathBuf>,

    /// Vector size of the hashing embedder
    #[serde(default = "default_hashing_dimension")]
    pub hashing_dimension: usize,

    /// Lower bound on the style cluster count
    #[serde(default = "default_min_style_clusters")]
    pub min_style_clusters: usize,

    /// Upper bound on the style cluster count
    #[serde(default = "default_max_style_clusters")]
    pub max_style_clusters: usize,

    /// Entries per recommendation response
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,

    /// Designs fetched per favourite style
    #[serde(default = "default_style_candidate_limit")]
    pub style_candidate_limit: usize,

    /// Host substitutions for catalogue image URLs
    #[serde(default)]
    pub image_host_rewrites: Vec<HostRewrite>,

    /// Origins allowed by CORS, empty means any
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            fetch_retries: default_fetch_retries(),
            fetch_backoff_millis: default_fetch_backoff_millis(),
            image_size: default_image_size(),
            interactive_colors: default_interactive_colors(),
            batch_colors: default_batch_colors(),
            kmeans_seed: default_kmeans_seed(),
            kmeans_max_iter: default_kmeans_max_iter(),
            kmeans_runs: default_kmeans_runs(),
            color_converge: default_color_converge(),
            embedding_backend: default_embedding_backend(),
            embedding_model_dir: None,
            hashing_dimension: default_hashing_dimension(),
            min_style_clusters: default_min_style_clusters(),
            max_style_clusters: default_max_style_clusters(),
            recommendation_limit: default_recommendation_limit(),
            style_candidate_limit: default_style_candidate_limit(),
            image_host_rewrites: Vec::new(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, writing defaults when it does not exist
    pub fn load(settings_path: &Path) -> Result<Self> {
        let mut config = if settings_path.exists() {
            let content =
                std::fs::read_to_string(settings_path).context("Failed to read settings file")?;
            serde_json::from_str(&content).context("Failed to parse settings file")?
        } else {
            let config = Self::default();
            config.save(settings_path)?;
            config
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.sanitize();

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, settings_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(settings_path, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Apply `STYLEPALETTE_*` overrides from the given lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("STYLEPALETTE_DB_PATH").filter(|v| !v.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path.trim()));
        }

        if let Some(dir) = lookup("STYLEPALETTE_MODEL_DIR").filter(|v| !v.trim().is_empty()) {
            self.embedding_model_dir = Some(PathBuf::from(dir.trim()));
        }

        if let Some(value) = lookup("STYLEPALETTE_EMBEDDING_BACKEND") {
            match EmbeddingBackend::from_str(&value) {
                Some(backend) => self.embedding_backend = backend,
                None => tracing::warn!("Ignoring unknown embedding backend '{}'", value),
            }
        }
    }

    /// Keep interdependent bounds consistent
    fn sanitize(&mut self) {
        let (min, max) = (self.min_style_clusters, self.max_style_clusters);
        self.min_style_clusters = min.clamp(MIN_STYLE_CLUSTERS, MAX_STYLE_CLUSTERS);
        self.max_style_clusters = max.clamp(self.min_style_clusters, MAX_STYLE_CLUSTERS);
        if (min, max) != (self.min_style_clusters, self.max_style_clusters) {
            tracing::warn!(
                "Style cluster bounds {}..={} adjusted to {}..={}",
                min,
                max,
                self.min_style_clusters,
                self.max_style_clusters
            );
        }

        self.image_size = self.image_size.max(1);
        self.interactive_colors = self.interactive_colors.max(1);
        self.batch_colors = self.batch_colors.max(1);
        self.hashing_dimension = self.hashing_dimension.max(1);
        self.kmeans_max_iter = self.kmeans_max_iter.max(1);
        self.kmeans_runs = self.kmeans_runs.max(1);
        self.recommendation_limit = self.recommendation_limit.max(1);
        self.style_candidate_limit = self.style_candidate_limit.max(1);
    }

    /// Apply the configured host rewrites to an image URL
    pub fn rewrite_image_url(&self, url: &str) -> String {
        let mut rewritten = url.to_string();
        for rewrite in &self.image_host_rewrites {
            if rewrite.from.is_empty() || rewritten.contains(&rewrite.to) {
                continue;
            }
            rewritten = rewritten.replace(&rewrite.from, &rewrite.to);
        }
        rewritten
    }
}

// Default value functions for serde

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_fetch_retries() -> usize {
    3
}

fn default_fetch_backoff_millis() -> u64 {
    300
}

fn default_image_size() -> u32 {
    150
}

fn default_interactive_colors() -> usize {
    6
}

fn default_batch_colors() -> usize {
    5
}

fn default_kmeans_seed() -> u64 {
    42
}

fn default_kmeans_max_iter() -> usize {
    300
}

fn default_kmeans_runs() -> usize {
    1
}

fn default_color_converge() -> f32 {
    0.0025
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::Minilm
}

fn default_hashing_dimension() -> usize {
    384
}

fn default_min_style_clusters() -> usize {
    MIN_STYLE_CLUSTERS
}

fn default_max_style_clusters() -> usize {
    MAX_STYLE_CLUSTERS
}

fn default_recommendation_limit() -> usize {
    3
}

fn default_style_candidate_limit() -> usize {
    5
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

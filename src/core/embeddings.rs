//! Sentence embeddings for design prompts
//!
//! The clustering job fuses these vectors with color features. The MiniLM
//! embedder runs all-MiniLM-L6-v2 locally through candle, the hashing embedder
//! is a deterministic fallback that needs no model files.

use anyhow::Result;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use twox_hash::XxHash64;

use crate::config::{AppConfig, EmbeddingBackend, Paths};

/// Maps prompts to fixed-size vectors, one per input, in input order
pub trait SentenceEmbedder: Send + Sync {
    fn dimension(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Token-hashing bag of words, L2-normalized
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];

        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }

            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();

            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * (0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32);
        }

        l2_normalize(&mut v);
        v
    }
}

impl SentenceEmbedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-12 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

#[cfg(feature = "bert")]
pub use minilm::MiniLmEmbedder;

#[cfg(feature = "bert")]
mod minilm {
    use anyhow::{anyhow, Context, Result};
    use candle_core::{DType, Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config, DTYPE};
    use std::path::Path;
    use tokenizers::Tokenizer;

    use super::SentenceEmbedder;

    const MAX_TOKENS: usize = 256;

    /// all-MiniLM-L6-v2 with masked mean pooling
    pub struct MiniLmEmbedder {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
        dim: usize,
        pad_id: u32,
    }

    impl MiniLmEmbedder {
        /// Load config.json, tokenizer.json and model.safetensors from `dir`
        pub fn load(dir: &Path) -> Result<Self> {
            let device = Device::Cpu;

            let config_path = dir.join("config.json");
            let config: Config = serde_json::from_str(
                &std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?,
            )?;

            let tokenizer_path = dir.join("tokenizer.json");
            let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
                anyhow!(
                    "Failed to load tokenizer from {}: {}",
                    tokenizer_path.display(),
                    e
                )
            })?;
            let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

            let weights_path = dir.join("model.safetensors");
            let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
            let model = BertModel::load(vb, &config)?;

            tracing::info!("Loaded sentence embedding model from {}", dir.display());

            Ok(Self {
                model,
                tokenizer,
                device,
                dim: config.hidden_size,
                pad_id,
            })
        }

        /// Token ids and attention mask padded to the longest input of the batch
        fn encode(&self, texts: &[String]) -> Result<(Tensor, Tensor)> {
            let mut rows = Vec::with_capacity(texts.len());
            for text in texts {
                let enc = self
                    .tokenizer
                    .encode(text.as_str(), true)
                    .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
                let mut ids = enc.get_ids().to_vec();
                let mut mask = enc.get_attention_mask().to_vec();
                ids.truncate(MAX_TOKENS);
                mask.truncate(MAX_TOKENS);
                rows.push((ids, mask));
            }

            let len = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
            let mut flat_ids = Vec::with_capacity(rows.len() * len);
            let mut flat_mask = Vec::with_capacity(rows.len() * len);
            for (ids, mask) in rows {
                let pad = len - ids.len();
                flat_ids.extend(ids);
                flat_ids.extend(std::iter::repeat(self.pad_id).take(pad));
                flat_mask.extend(mask);
                flat_mask.extend(std::iter::repeat(0u32).take(pad));
            }

            let shape = (texts.len(), len);
            Ok((
                Tensor::from_vec(flat_ids, shape, &self.device)?,
                Tensor::from_vec(flat_mask, shape, &self.device)?,
            ))
        }
    }

    /// Mean of the unmasked token states, then L2 normalization
    fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask = attention_mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let lengths = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean = summed.broadcast_div(&lengths)?;

        let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        Ok(mean.broadcast_div(&norm)?)
    }

    impl SentenceEmbedder for MiniLmEmbedder {
        fn dimension(&self) -> usize {
            self.dim
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let (ids, mask) = self.encode(texts)?;
            let type_ids = ids.zeros_like()?;
            let hidden = self.model.forward(&ids, &type_ids, Some(&mask))?;

            let pooled = masked_mean_l2(&hidden, &mask)?;
            Ok(pooled.to_dtype(DType::F32)?.to_vec2::<f32>()?)
        }
    }
}

fn model_files_present(dir: &Path) -> bool {
    ["config.json", "tokenizer.json", "model.safetensors"]
        .iter()
        .all(|f| dir.join(f).exists())
}

fn model_dir(config: &AppConfig, paths: &Paths) -> PathBuf {
    config
        .embedding_model_dir
        .clone()
        .unwrap_or_else(|| paths.default_embedding_model_dir())
}

/// Build the configured embedder, falling back to hashing when the model
/// cannot be loaded
pub fn build_embedder(config: &AppConfig, paths: &Paths) -> Arc<dyn SentenceEmbedder> {
    let fallback = || -> Arc<dyn SentenceEmbedder> {
        Arc::new(HashingEmbedder::new(config.hashing_dimension))
    };

    if config.embedding_backend == EmbeddingBackend::Hashing {
        tracing::info!("Using hashing sentence embedder");
        return fallback();
    }

    let dir = model_dir(config, paths);
    if !model_files_present(&dir) {
        tracing::warn!(
            "Embedding model not found in {}, using hashing embedder",
            dir.display()
        );
        return fallback();
    }

    #[cfg(feature = "bert")]
    {
        match MiniLmEmbedder::load(&dir) {
            Ok(model) => Arc::new(model),
            Err(e) => {
                tracing::warn!("Failed to load embedding model: {:#}, using hashing embedder", e);
                fallback()
            }
        }
    }

    #[cfg(not(feature = "bert"))]
    {
        tracing::warn!("Built without the bert feature, using hashing embedder");
        fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_hashing_embedder_is_normalized_and_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["retro sunset over neon city".to_string()];

        let a = embedder.embed_batch(&texts).unwrap();
        let b = embedder.embed_batch(&texts).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);

        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(384);
        let v = embedder
            .embed_batch(&[
                "minimal pastel floral pattern".to_string(),
                "Pastel floral pattern, minimal!".to_string(),
                "dark gothic skull illustration".to_string(),
            ])
            .unwrap();

        assert!((cosine(&v[0], &v[1]) - 1.0).abs() < 1e-5);
        assert!(cosine(&v[0], &v[2]) < 0.9);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        let v = embedder.embed_batch(&["   ".to_string()]).unwrap();
        assert!(v[0].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_missing_model_falls_back_to_hashing() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(Some(dir.path().to_path_buf())).unwrap();
        let mut config = AppConfig::default();
        config.hashing_dimension = 32;
        config.embedding_model_dir = Some(dir.path().join("nowhere"));

        let embedder = build_embedder(&config, &paths);
        assert_eq!(embedder.dimension(), 32);
    }
}

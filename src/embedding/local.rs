//! In-process embeddings via fastembed.
//!
//! The model is downloaded from Hugging Face on first load and cached; after
//! that no network calls are made. Loading and inference are CPU-bound and run
//! on tokio's blocking pool.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{ensure_count, Embedder};
use crate::config::EmbeddingConfig;

/// Multilingual paraphrase model covering Indic and Latin scripts.
pub const DEFAULT_LOCAL_MODEL: &str = "paraphrase-multilingual-minilm-l12-v2";

/// Supported local model names and their vector dimensionality.
pub const LOCAL_MODELS: [(&str, usize); 8] = [
    ("paraphrase-multilingual-minilm-l12-v2", 384),
    ("paraphrase-multilingual-minilm-l12-v2-q", 384),
    ("paraphrase-multilingual-mpnet-base-v2", 768),
    ("multilingual-e5-small", 384),
    ("multilingual-e5-base", 768),
    ("multilingual-e5-large", 1024),
    ("all-minilm-l6-v2", 384),
    ("bge-small-en-v1.5", 384),
];

fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    use fastembed::EmbeddingModel as M;
    Ok(match name {
        "paraphrase-multilingual-minilm-l12-v2" => M::ParaphraseMLMiniLML12V2,
        "paraphrase-multilingual-minilm-l12-v2-q" => M::ParaphraseMLMiniLML12V2Q,
        "paraphrase-multilingual-mpnet-base-v2" => M::ParaphraseMLMpnetBaseV2,
        "multilingual-e5-small" => M::MultilingualE5Small,
        "multilingual-e5-base" => M::MultilingualE5Base,
        "multilingual-e5-large" => M::MultilingualE5Large,
        "all-minilm-l6-v2" => M::AllMiniLML6V2,
        "bge-small-en-v1.5" => M::BGESmallENV15,
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: {}",
            other,
            LOCAL_MODELS
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

fn default_dims(name: &str) -> usize {
    LOCAL_MODELS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, dims)| *dims)
        .unwrap_or(384)
}

/// fastembed model shared across requests.
///
/// Inference needs `&mut` access to the ONNX session, so concurrent encodes
/// are serialized through a mutex.
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<fastembed::TextEmbedding>>,
}

impl LocalEmbedder {
    /// Load (and on first run, download) the configured model.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        let fastembed_model = to_fastembed_model(&model_name)?;
        let dims = config.dims.unwrap_or_else(|| default_dims(&model_name));
        let cache_dir = config.cache_dir.clone();

        tracing::info!(model = %model_name, "loading local embedding model");

        let model = tokio::task::spawn_blocking(move || {
            let mut options = fastembed::InitOptions::new(fastembed_model)
                .with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .context("Local model loading task failed")?
        .map_err(|e| {
            anyhow!(
                "Failed to initialize local embedding model '{}': {}",
                model_name,
                e
            )
        })?;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size.max(1),
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> Option<usize> {
        Some(self.dims)
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let batch = texts.to_vec();
        let batch_size = self.batch_size;

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow!("Local embedding model lock poisoned"))?;
            model
                .embed(batch, Some(batch_size))
                .map_err(|e| anyhow!("Local embedding failed: {}", e))
        })
        .await
        .context("Local embedding task failed")??;

        ensure_count(texts.len(), &vectors)?;
        Ok(vectors)
    }
}

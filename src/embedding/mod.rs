//! Sentence embedding backends.
//!
//! Defines the [`Embedder`] trait, the [`EmbedderHandle`] that models a
//! backend which may have failed to load, and [`SharedEmbedder`], which loads
//! the configured backend once per process and hands out the cached result.
//!
//! | Config Value | Backend |
//! |-------------|---------|
//! | `"local"` | `LocalEmbedder` (fastembed, in-process) |
//! | `"ollama"` | [`OllamaEmbedder`] |
//! | `"openai"` | [`OpenAiEmbedder`] |
//! | `"disabled"` | always [`EmbedderHandle::Unavailable`] |
//!
//! Loading never fails to the caller. A backend that cannot be initialized
//! becomes [`EmbedderHandle::Unavailable`] and stays that way for the life of
//! the process; duplicate detection is skipped, submissions still go through.

#[cfg(feature = "local-embeddings")]
mod local;
mod remote;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::EmbeddingConfig;

#[cfg(feature = "local-embeddings")]
pub use local::{LocalEmbedder, DEFAULT_LOCAL_MODEL, LOCAL_MODELS};
pub use remote::{OllamaEmbedder, OpenAiEmbedder};

/// A text embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"paraphrase-multilingual-minilm-l12-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the vector dimensionality, when known before the first call.
    fn dims(&self) -> Option<usize>;

    /// Embed a batch of texts.
    ///
    /// Returns exactly one vector per input, in input order. Batching is a
    /// throughput concern only: encoding `[a, b]` gives the same vectors as
    /// encoding `[a]` and `[b]` separately.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn encode_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let results = embedder.encode(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Outcome of loading an embedding backend.
#[derive(Clone)]
pub enum EmbedderHandle {
    Ready(Arc<dyn Embedder>),
    Unavailable { reason: String },
}

impl EmbedderHandle {
    pub fn ready(embedder: impl Embedder + 'static) -> Self {
        EmbedderHandle::Ready(Arc::new(embedder))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        EmbedderHandle::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn embedder(&self) -> Option<&dyn Embedder> {
        match self {
            EmbedderHandle::Ready(embedder) => Some(embedder.as_ref()),
            EmbedderHandle::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, EmbedderHandle::Ready(_))
    }
}

impl fmt::Debug for EmbedderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedderHandle::Ready(embedder) => f
                .debug_struct("Ready")
                .field("model", &embedder.model_name())
                .field("dims", &embedder.dims())
                .finish(),
            EmbedderHandle::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Initialize the configured backend, converting any failure into
/// [`EmbedderHandle::Unavailable`].
pub async fn load(config: &EmbeddingConfig) -> EmbedderHandle {
    match try_load(config).await {
        Ok(embedder) => {
            tracing::info!(
                provider = %config.provider,
                model = embedder.model_name(),
                dims = ?embedder.dims(),
                "embedding model loaded"
            );
            EmbedderHandle::Ready(embedder)
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::warn!(
                provider = %config.provider,
                %reason,
                "embedding model unavailable; duplicate detection disabled"
            );
            EmbedderHandle::Unavailable { reason }
        }
    }
}

async fn try_load(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => bail!("embedding provider is disabled"),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(LocalEmbedder::load(config).await?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Process-wide embedder that is loaded on first use.
///
/// The first caller of [`get`](SharedEmbedder::get) runs [`load`]; concurrent
/// callers wait for that same load. The result, ready or unavailable, is
/// cached and never retried.
pub struct SharedEmbedder {
    config: EmbeddingConfig,
    cell: OnceCell<EmbedderHandle>,
}

impl SharedEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Wrap an already-constructed handle, e.g. a custom [`Embedder`].
    pub fn preloaded(handle: EmbedderHandle) -> Self {
        Self {
            config: EmbeddingConfig::default(),
            cell: OnceCell::new_with(Some(handle)),
        }
    }

    pub async fn get(&self) -> &EmbedderHandle {
        self.cell.get_or_init(|| load(&self.config)).await
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

/// Fail unless a backend returned one vector per input.
pub(crate) fn ensure_count(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        bail!(
            "embedding backend returned {} vectors for {} inputs",
            vectors.len(),
            expected
        );
    }
    Ok(())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-norm vector.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoLength;

    #[async_trait]
    impl Embedder for EchoLength {
        fn model_name(&self) -> &str {
            "echo-length"
        }
        fn dims(&self) -> Option<usize> {
            Some(2)
        }
        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_scale_invariant() {
        let a = vec![1.0, 2.0, 2.0];
        let b = vec![10.0, 20.0, 20.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn encode_one_returns_single_vector() {
        let v = encode_one(&EchoLength, "abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[tokio::test]
    async fn disabled_provider_is_unavailable() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            ..Default::default()
        };
        let handle = load(&config).await;
        match handle {
            EmbedderHandle::Unavailable { reason } => assert!(reason.contains("disabled")),
            EmbedderHandle::Ready(_) => panic!("disabled provider must not load"),
        }
    }

    #[tokio::test]
    async fn openai_without_key_is_unavailable() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            model: Some("text-embedding-3-small".to_string()),
            ..Default::default()
        };
        assert!(!load(&config).await.is_available());
    }

    #[tokio::test]
    async fn shared_embedder_loads_once() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            ..Default::default()
        };
        let shared = SharedEmbedder::new(config);
        assert!(!shared.is_loaded());
        let first = shared.get().await as *const EmbedderHandle;
        assert!(shared.is_loaded());
        let second = shared.get().await as *const EmbedderHandle;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn preloaded_handle_is_returned_as_is() {
        let shared = SharedEmbedder::preloaded(EmbedderHandle::ready(EchoLength));
        assert!(shared.is_loaded());
        let handle = shared.get().await;
        assert_eq!(handle.embedder().unwrap().model_name(), "echo-length");
    }

    #[test]
    fn ensure_count_rejects_mismatch() {
        assert!(ensure_count(2, &[vec![1.0], vec![2.0]]).is_ok());
        assert!(ensure_count(2, &[vec![1.0]]).is_err());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let config = EmbeddingConfig {
            provider: "disabled".to_string(),
            ..Default::default()
        };
        let shared = SharedEmbedder::new(config);
        let (a, b) = tokio::join!(shared.get(), shared.get());
        assert!(std::ptr::eq(a, b));
    }
}

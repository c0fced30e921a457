//! HTTP embedding backends (Ollama and OpenAI).
//!
//! Both split the input into `batch_size` requests and retry transient
//! failures with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use super::{ensure_count, Embedder};
use crate::config::EmbeddingConfig;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Settings shared by both HTTP backends.
struct HttpSettings {
    client: reqwest::Client,
    model: String,
    dims: Option<usize>,
    batch_size: usize,
    max_retries: u32,
}

impl HttpSettings {
    fn from_config(config: &EmbeddingConfig, provider: &str) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for {} provider", provider))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            model,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        })
    }
}

// ============ Ollama ============

/// Embeddings from a local Ollama instance via `POST /api/embed`.
///
/// Requires Ollama to be running with a multilingual embedding model pulled.
pub struct OllamaEmbedder {
    settings: HttpSettings,
    url: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let settings = HttpSettings::from_config(config, "Ollama")?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self { settings, url })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    fn dims(&self) -> Option<usize> {
        self.settings.dims
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let endpoint = format!("{}/api/embed", self.url);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.settings.batch_size) {
            let body = serde_json::json!({
                "model": self.settings.model,
                "input": batch,
            });
            let json = post_with_retry("Ollama", self.settings.max_retries, || {
                self.settings.client.post(&endpoint).json(&body)
            })
            .await?;
            let parsed = parse_ollama_response(&json)?;
            ensure_count(batch.len(), &parsed)?;
            vectors.extend(parsed);
        }

        Ok(vectors)
    }
}

fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    json.get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?
        .iter()
        .map(parse_vector)
        .collect()
}

// ============ OpenAI ============

/// Embeddings from the OpenAI API. Requires `OPENAI_API_KEY`.
pub struct OpenAiEmbedder {
    settings: HttpSettings,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let settings = HttpSettings::from_config(config, "OpenAI")?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self { settings, api_key })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    fn dims(&self) -> Option<usize> {
        self.settings.dims
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.settings.batch_size) {
            let body = serde_json::json!({
                "model": self.settings.model,
                "input": batch,
            });
            let json = post_with_retry("OpenAI", self.settings.max_retries, || {
                self.settings
                    .client
                    .post(OPENAI_EMBEDDINGS_URL)
                    .bearer_auth(&self.api_key)
                    .json(&body)
            })
            .await?;
            let parsed = parse_openai_response(&json)?;
            ensure_count(batch.len(), &parsed)?;
            vectors.extend(parsed);
        }

        Ok(vectors)
    }
}

/// Extract `data[].embedding`, ordered by each entry's `index`.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        indexed.push((index, parse_vector(embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_vector(value: &Value) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("Invalid embedding: not an array"))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow!("Invalid embedding: non-numeric component {}", v))
        })
        .collect()
}

// ============ Retry ============

async fn post_with_retry<F>(service: &str, max_retries: u32, request: F) -> Result<Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::debug!(service, attempt, ?delay, "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        match request().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Invalid {} response body", service));
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = anyhow!("{} API error {}: {}", service, status, body_text);
                if !is_retryable(status) {
                    return Err(err);
                }
                last_err = Some(err);
            }
            Err(e) => {
                last_err = Some(anyhow!("{} connection error: {}", service, e));
            }
        }
    }

    match last_err {
        Some(err) => Err(err),
        None => bail!("{} embedding failed after retries", service),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.saturating_sub(1).min(5))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(8));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(20), Duration::from_secs(32));
    }

    #[test]
    fn retries_only_transient_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn openai_response_is_reordered_by_index() {
        let json = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]},
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn openai_response_missing_data_is_error() {
        assert!(parse_openai_response(&json!({"object": "list"})).is_err());
    }

    #[test]
    fn ollama_response_parses_embeddings() {
        let json = json!({"embeddings": [[0.5, 0.25], [1.0, -1.0]]});
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.25], vec![1.0, -1.0]]);
    }

    #[test]
    fn non_numeric_component_is_rejected() {
        let json = json!({"embeddings": [[0.5, "x"]]});
        assert!(parse_ollama_response(&json).is_err());
    }

    #[test]
    fn ollama_url_is_normalized() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            url: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        let embedder = OllamaEmbedder::new(&config).unwrap();
        assert_eq!(embedder.url, "http://gpu-box:11434");
        assert_eq!(embedder.model_name(), "nomic-embed-text");
    }

    #[test]
    fn model_is_required() {
        let config = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert!(OllamaEmbedder::new(&config).is_err());
    }
}

//! TOML configuration.
//!
//! ```toml
//! [store]
//! backend = "json"        # json | sqlite | memory
//! path = "./data"
//!
//! [embedding]
//! provider = "local"      # local | ollama | openai | disabled
//! model = "paraphrase-multilingual-minilm-l12-v2"
//!
//! [dedup]
//! proverb_threshold = 0.85
//! life_lesson_threshold = 0.80
//! on_duplicate = "block"  # block | warn
//!
//! [server]
//! bind = "127.0.0.1:8501"
//! ```
//!
//! Every section and field has a default, so an empty file is a valid config.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::Category;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory for the `json` backend, database file for `sqlite`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
        }
    }
}

fn default_backend() -> String {
    "json".to_string()
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
    /// Model download cache for the `local` provider.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            cache_dir: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// What happens to a submission flagged as a potential duplicate.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refuse to save; the contributor may resubmit with `force`.
    #[default]
    Block,
    /// Save anyway and report the match alongside the new item.
    Warn,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DedupConfig {
    #[serde(default = "default_proverb_threshold")]
    pub proverb_threshold: f32,
    #[serde(default = "default_life_lesson_threshold")]
    pub life_lesson_threshold: f32,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            proverb_threshold: default_proverb_threshold(),
            life_lesson_threshold: default_life_lesson_threshold(),
            on_duplicate: DuplicatePolicy::default(),
        }
    }
}

// Life lessons run longer and vary more, so the bar for flagging is lower.
fn default_proverb_threshold() -> f32 {
    0.85
}
fn default_life_lesson_threshold() -> f32 {
    0.80
}

impl DedupConfig {
    pub fn threshold_for(&self, category: Category) -> f32 {
        match category {
            Category::Proverb => self.proverb_threshold,
            Category::LifeLesson => self.life_lesson_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.store.backend.as_str() {
        "json" | "sqlite" | "memory" => {}
        other => anyhow::bail!(
            "Unknown store backend: '{}'. Must be json, sqlite, or memory.",
            other
        ),
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" | "ollama" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, ollama, or openai.",
            other
        ),
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }

    // Remote providers have no built-in default model.
    if matches!(config.embedding.provider.as_str(), "ollama" | "openai")
        && config.embedding.model.is_none()
    {
        anyhow::bail!(
            "embedding.model must be specified when provider is '{}'",
            config.embedding.provider
        );
    }

    for (name, value) in [
        ("dedup.proverb_threshold", config.dedup.proverb_threshold),
        (
            "dedup.life_lesson_threshold",
            config.dedup.life_lesson_threshold,
        ),
    ] {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("{} must be in [0.0, 1.0], got {}", name, value);
        }
    }

    Ok(())
}

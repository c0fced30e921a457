//! Flat-file [`CorpusStore`]: `<dir>/proverbs.json` and `<dir>/life_lessons.json`.
//!
//! Each file holds a pretty-printed JSON array of items. Writes go to a
//! temporary sibling file that is then renamed over the original, so a crash
//! mid-write leaves the previous contents intact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::CorpusStore;
use crate::models::{Category, Item};

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn file_for(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.json", category.collection()))
    }
}

#[async_trait]
impl CorpusStore for JsonFileStore {
    fn backend_name(&self) -> &str {
        "json"
    }

    async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create store directory: {}", self.dir.display()))
    }

    async fn load_all(&self, category: Category) -> Result<Vec<Item>> {
        let path = self.file_for(category);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let items: Vec<Item> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let misfiled = items.iter().filter(|i| i.category != category).count();
        if misfiled > 0 {
            tracing::warn!(
                file = %path.display(),
                misfiled,
                "items with a different type found in {} collection",
                category.plural()
            );
        }

        Ok(items)
    }

    async fn save_all(&self, category: Category, items: &[Item]) -> Result<()> {
        self.prepare().await?;

        let path = self.file_for(category);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(items)?;

        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        tracing::debug!(file = %path.display(), count = items.len(), "saved collection");
        Ok(())
    }
}

//! Corpus storage.
//!
//! The [`CorpusStore`] trait is the whole contract the rest of the crate
//! needs from persistence: load a category's items in insertion order, and
//! overwrite them. Backends:
//!
//! | Config Value | Backend |
//! |-------------|---------|
//! | `"json"` | [`JsonFileStore`]: one JSON array file per category |
//! | `"sqlite"` | [`SqliteStore`]: one `items` table |
//! | `"memory"` | [`InMemoryStore`]: process-local, for tests and demos |
//!
//! Appends are read-modify-write with no locking across processes; when two
//! submissions race, the last write wins.

pub mod json;
pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::models::{Category, Item};

pub use json::JsonFileStore;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Short backend identifier for logs.
    fn backend_name(&self) -> &str;

    /// Create whatever the backend needs (directories, schema). Idempotent.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// All items of `category`, oldest first. Empty when nothing is stored.
    async fn load_all(&self, category: Category) -> Result<Vec<Item>>;

    /// Replace the stored items of `category` with `items`.
    async fn save_all(&self, category: Category, items: &[Item]) -> Result<()>;

    /// Add one item to the end of `category`.
    ///
    /// Re-reads the stored corpus rather than trusting an earlier load, so a
    /// failed read can never turn into an overwrite with a partial list.
    async fn append(&self, category: Category, item: Item) -> Result<()> {
        let mut items = self.load_all(category).await?;
        if items.iter().any(|existing| existing.id == item.id) {
            bail!("item id {} already stored in {}", item.id, category.plural());
        }
        items.push(item);
        self.save_all(category, &items).await
    }
}

/// Open the backend named in `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn CorpusStore>> {
    let store: Arc<dyn CorpusStore> = match config.backend.as_str() {
        "json" => Arc::new(JsonFileStore::new(&config.path)),
        "sqlite" => Arc::new(SqliteStore::connect(&config.path).await?),
        "memory" => Arc::new(InMemoryStore::new()),
        other => bail!("Unknown store backend: {}", other),
    };
    tracing::debug!(backend = store.backend_name(), path = %config.path.display(), "opened store");
    Ok(store)
}

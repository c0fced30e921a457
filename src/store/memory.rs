//! In-memory [`CorpusStore`] for testing and demos.
//!
//! Contents live for the lifetime of the value; nothing is written to disk.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::CorpusStore;
use crate::models::{Category, Item};

pub struct InMemoryStore {
    collections: RwLock<HashMap<Category, Vec<Item>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Store pre-populated with `items`, each filed under its own category.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut collections: HashMap<Category, Vec<Item>> = HashMap::new();
        for item in items {
            collections.entry(item.category).or_default().push(item);
        }
        Self {
            collections: RwLock::new(collections),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorpusStore for InMemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn load_all(&self, category: Category) -> Result<Vec<Item>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(collections.get(&category).cloned().unwrap_or_default())
    }

    async fn save_all(&self, category: Category, items: &[Item]) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        collections.insert(category, items.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: Category, text: &str) -> Item {
        Item::new(category, text, "English".into(), None, None)
    }

    #[tokio::test]
    async fn empty_store_loads_nothing() {
        let store = InMemoryStore::new();
        assert!(store.load_all(Category::Proverb).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn categories_are_separate() {
        let store = InMemoryStore::with_items([
            item(Category::Proverb, "a"),
            item(Category::LifeLesson, "b"),
        ]);
        let proverbs = store.load_all(Category::Proverb).await.unwrap();
        assert_eq!(proverbs.len(), 1);
        assert_eq!(proverbs[0].text, "a");
    }

    #[tokio::test]
    async fn append_keeps_order() {
        let store = InMemoryStore::new();
        store
            .append(Category::Proverb, item(Category::Proverb, "first"))
            .await
            .unwrap();
        store
            .append(Category::Proverb, item(Category::Proverb, "second"))
            .await
            .unwrap();
        let texts: Vec<String> = store
            .load_all(Category::Proverb)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn append_rejects_duplicate_id() {
        let store = InMemoryStore::new();
        let first = item(Category::Proverb, "first");
        store.append(Category::Proverb, first.clone()).await.unwrap();
        assert!(store.append(Category::Proverb, first).await.is_err());
    }

    #[tokio::test]
    async fn save_of_load_is_identity() {
        let store = InMemoryStore::with_items([
            item(Category::Proverb, "a"),
            item(Category::Proverb, "b"),
        ]);
        let before = store.load_all(Category::Proverb).await.unwrap();
        store.save_all(Category::Proverb, &before).await.unwrap();
        assert_eq!(store.load_all(Category::Proverb).await.unwrap(), before);
    }
}

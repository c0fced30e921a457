//! SQLite-backed [`CorpusStore`].
//!
//! Both collections share one `items` table, keyed by collection name and
//! insertion position. `save_all` replaces a collection inside a transaction.

use std::path::Path;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::CorpusStore;
use crate::db;
use crate::migrate;
use crate::models::{Category, Item};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and ensure the schema.
    pub async fn connect(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

async fn insert_item(
    tx: &mut Transaction<'_, Sqlite>,
    category: Category,
    position: i64,
    item: &Item,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO items (collection, position, id, timestamp, language,
                           region_hint, contributor, text, item_type)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(category.collection())
    .bind(position)
    .bind(&item.id)
    .bind(&item.timestamp)
    .bind(&item.language)
    .bind(&item.region_hint)
    .bind(&item.contributor)
    .bind(&item.text)
    .bind(item.category.label())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl CorpusStore for SqliteStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn prepare(&self) -> Result<()> {
        migrate::run_migrations(&self.pool).await
    }

    async fn load_all(&self, category: Category) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT id, timestamp, language, region_hint, contributor, text, item_type \
             FROM items WHERE collection = ? ORDER BY position",
        )
        .bind(category.collection())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let item_type: String = row.get("item_type");
                let item_category = item_type
                    .parse::<Category>()
                    .map_err(|e| anyhow!("corrupt item_type in {}: {}", category.plural(), e))?;
                Ok(Item {
                    id: row.get("id"),
                    timestamp: row.get("timestamp"),
                    language: row.get("language"),
                    region_hint: row.get("region_hint"),
                    contributor: row.get("contributor"),
                    text: row.get("text"),
                    category: item_category,
                })
            })
            .collect()
    }

    async fn save_all(&self, category: Category, items: &[Item]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM items WHERE collection = ?")
            .bind(category.collection())
            .execute(&mut *tx)
            .await?;

        for (position, item) in items.iter().enumerate() {
            insert_item(&mut tx, category, position as i64, item).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append(&self, category: Category, item: Item) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM items WHERE collection = ?",
        )
        .bind(category.collection())
        .fetch_one(&mut *tx)
        .await?;

        insert_item(&mut tx, category, next, &item).await?;

        tx.commit().await?;
        Ok(())
    }
}

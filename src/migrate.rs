use anyhow::Result;
use sqlx::SqlitePool;

/// Create the `items` table and its indexes. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // `position` preserves insertion order within a collection; the detector
    // scans items in that order.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            collection TEXT NOT NULL,
            position INTEGER NOT NULL,
            id TEXT NOT NULL,
            timestamp TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL,
            region_hint TEXT NOT NULL DEFAULT '',
            contributor TEXT NOT NULL,
            text TEXT NOT NULL,
            item_type TEXT NOT NULL,
            PRIMARY KEY (collection, position),
            UNIQUE (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_items_timestamp ON items(collection, timestamp DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

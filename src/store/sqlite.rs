//! SQLite-backed [`VectorStore`].
//!
//! One database file (`collections.sqlite`) inside the configured store
//! directory holds any number of named collections. The collection a store
//! handle is bound to is registered the first time the handle is opened.
//! Embeddings are stored as little-endian `f32` BLOBs and searched by brute
//! force.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::element::Element;
use crate::embedding::{blob_to_vec, vec_to_blob, Embedder, PlaceholderEmbedder};
use crate::models::{ElementMetadata, SearchHit, VectorRecord};

use super::{rank_records, resolve_count, UpsertOutcome, VectorStore};

pub const DB_FILE_NAME: &str = "collections.sqlite";

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    embedder: Box<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the store in `dir` and bind it to
    /// `collection`.
    pub async fn open(dir: &Path, collection: &str) -> Result<Self> {
        Self::open_with_embedder(dir, collection, Box::new(PlaceholderEmbedder::default())).await
    }

    pub async fn open_with_embedder(
        dir: &Path,
        collection: &str,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;

        let options = SqliteConnectOptions::new()
            .filename(db_path(dir))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open vector store in {}", dir.display()))?;

        run_migrations(&pool).await?;

        let store = Self {
            pool,
            collection: collection.to_string(),
            embedder,
        };
        store.ensure_collection().await?;
        tracing::debug!(
            "Opened collection '{}' in {} ({} embeddings, {} dims)",
            store.collection,
            dir.display(),
            store.embedder.model_name(),
            store.embedder.dims()
        );
        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Release the connection pool.
    pub async fn close(self) {
        self.pool.close().await;
    }

    async fn ensure_collection(&self) -> Result<()> {
        let created = sqlx::query(
            "INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)",
        )
        .bind(&self.collection)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if created > 0 {
            tracing::debug!("Created collection '{}'", self.collection);
        }
        Ok(())
    }
}

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE_NAME)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            document TEXT NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<VectorRecord> {
    let id: String = row.get("id");
    let updated_at: String = row.get("updated_at");
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .with_context(|| format!("Bad updated_at for record '{}': {}", id, updated_at))?
        .with_timezone(&Utc);
    let blob: Vec<u8> = row.get("embedding");

    Ok(VectorRecord {
        metadata: ElementMetadata {
            name: row.get("name"),
            version: row.get("version"),
            updated_at,
        },
        document: row.get("document"),
        embedding: blob_to_vec(&blob),
        id,
    })
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    async fn get_all(&self) -> Result<Vec<VectorRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, version, updated_at, document, embedding
            FROM records
            WHERE collection = ?
            ORDER BY id
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, version, updated_at, document, embedding
            FROM records
            WHERE collection = ? AND id = ?
            "#,
        )
        .bind(&self.collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn search(&self, query: &str, count: Option<usize>) -> Result<Vec<SearchHit>> {
        let records = self.get_all().await?;
        let limit = resolve_count(count, records.len());
        let query_vec = self.embedder.embed(query);
        Ok(rank_records(records, &query_vec, query, limit))
    }

    async fn upsert(&self, element: &Element) -> Result<UpsertOutcome> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM records WHERE collection = ? AND id = ?")
                .bind(&self.collection)
                .bind(&element.name)
                .fetch_optional(&self.pool)
                .await?;

        let updated_at = element.updated_at.to_rfc3339();
        let blob = vec_to_blob(&self.embedder.embed(&element.content));

        if existing.is_some() {
            sqlx::query(
                r#"
                UPDATE records
                SET name = ?, version = ?, updated_at = ?, document = ?, embedding = ?
                WHERE collection = ? AND id = ?
                "#,
            )
            .bind(&element.name)
            .bind(&element.version)
            .bind(&updated_at)
            .bind(&element.content)
            .bind(&blob)
            .bind(&self.collection)
            .bind(&element.name)
            .execute(&self.pool)
            .await?;
            Ok(UpsertOutcome::Updated)
        } else {
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, name, version, updated_at, document, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&self.collection)
            .bind(&element.name)
            .bind(&element.name)
            .bind(&element.version)
            .bind(&updated_at)
            .bind(&element.content)
            .bind(&blob)
            .execute(&self.pool)
            .await?;
            Ok(UpsertOutcome::Inserted)
        }
    }
}

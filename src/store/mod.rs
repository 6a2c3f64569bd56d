//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the capability the element and update code
//! depend on. Backends:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`sqlite::SqliteVectorStore`] | persistent collection under `CHROMADB_DIR` |
//! | [`memory::InMemoryVectorStore`] | tests |
//!
//! # Upsert semantics
//!
//! `upsert` looks the id up first and then issues either an update or an
//! insert. The two steps are not isolated from each other: two processes
//! upserting the same name at the same time can race.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::element::Element;
use crate::embedding::cosine_similarity;
use crate::models::{SearchHit, VectorRecord};

/// Name of the collection elements are stored in.
pub const DEFAULT_COLLECTION: &str = "elements";

/// Whether an upsert replaced a record or created one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A named, persistent collection of element records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`count`](VectorStore::count) | Number of records |
/// | [`get_all`](VectorStore::get_all) | Every record, ordered by id |
/// | [`get`](VectorStore::get) | One record by id |
/// | [`search`](VectorStore::search) | Similarity search with a result cap |
/// | [`upsert`](VectorStore::upsert) | Insert or replace by element name |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn count(&self) -> Result<usize>;

    async fn get_all(&self) -> Result<Vec<VectorRecord>>;

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>>;

    /// Rank records against `query`. `count = None` returns every record
    /// (at least one slot is always requested).
    async fn search(&self, query: &str, count: Option<usize>) -> Result<Vec<SearchHit>>;

    async fn upsert(&self, element: &Element) -> Result<UpsertOutcome>;
}

/// Result cap for a search over a collection of `size` records. Never
/// below one.
pub fn resolve_count(count: Option<usize>, size: usize) -> usize {
    count.unwrap_or(size).max(1)
}

/// Build a record for `element` with the given embedding.
pub fn record_for(element: &Element, embedding: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: element.name.clone(),
        metadata: element.metadata(),
        document: element.content.clone(),
        embedding,
    }
}

/// Order records by cosine similarity to `query_vec`, best first.
///
/// Ties (which is every record while embeddings are placeholders) go to an
/// exact id match with `query`, then to id order.
pub fn rank_records(
    records: Vec<VectorRecord>,
    query_vec: &[f32],
    query: &str,
    limit: usize,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = records
        .into_iter()
        .map(|record| {
            let score = cosine_similarity(query_vec, &record.embedding) as f64;
            SearchHit { record, score }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (b.record.id == query).cmp(&(a.record.id == query)))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    hits.truncate(limit);
    hits
}

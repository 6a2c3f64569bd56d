//! In-memory [`VectorStore`] for tests.
//!
//! Records live in a `BTreeMap` behind a `RwLock`. Search is brute-force
//! cosine similarity over every record.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::element::Element;
use crate::embedding::{Embedder, PlaceholderEmbedder};
use crate::models::{SearchHit, VectorRecord};

use super::{rank_records, record_for, resolve_count, UpsertOutcome, VectorStore};

pub struct InMemoryVectorStore {
    records: RwLock<BTreeMap<String, VectorRecord>>,
    embedder: Box<dyn Embedder>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::with_embedder(Box::new(PlaceholderEmbedder::default()))
    }

    pub fn with_embedder(embedder: Box<dyn Embedder>) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            embedder,
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().unwrap().len())
    }

    async fn get_all(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.records.read().unwrap().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }

    async fn search(&self, query: &str, count: Option<usize>) -> Result<Vec<SearchHit>> {
        let records = self.get_all().await?;
        let limit = resolve_count(count, records.len());
        let query_vec = self.embedder.embed(query);
        Ok(rank_records(records, &query_vec, query, limit))
    }

    async fn upsert(&self, element: &Element) -> Result<UpsertOutcome> {
        let existing = self.get(&element.name).await?;
        let record = record_for(element, self.embedder.embed(&element.content));
        self.records
            .write()
            .unwrap()
            .insert(element.name.clone(), record);
        Ok(match existing {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_inserts_then_updates() {
        let store = InMemoryVectorStore::new();
        let first = Element::new("serde", "1.0", "v1 docs").unwrap();
        assert_eq!(store.upsert(&first).await.unwrap(), UpsertOutcome::Inserted);

        let second = Element::new("serde", "1.1", "v1.1 docs").unwrap();
        assert_eq!(store.upsert(&second).await.unwrap(), UpsertOutcome::Updated);

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.get("serde").await.unwrap().unwrap();
        assert_eq!(stored.metadata.version, "1.1");
        assert_eq!(stored.document, "v1.1 docs");
    }

    #[tokio::test]
    async fn search_on_empty_store() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("anything", None).await.unwrap().is_empty());
    }
}

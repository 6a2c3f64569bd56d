//! Records stored in the vector collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementMetadata {
    pub name: String,
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

/// One record in a vector collection. `id` is the element name.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub metadata: ElementMetadata,
    pub document: String,
    pub embedding: Vec<f32>,
}

/// A record returned from similarity search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: VectorRecord,
    /// Cosine similarity between the query and the record embedding.
    pub score: f64,
}

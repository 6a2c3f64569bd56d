//! Embeddings for the vector store.
//!
//! No embedding model is wired in yet: [`PlaceholderEmbedder`] returns a
//! fixed-length, content-independent vector so records keep the shape a real
//! model would give them. Also provides the vector utilities the SQLite
//! store uses:
//! - [`cosine_similarity`]: similarity between two vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` BLOB encoding

/// Dimensionality of placeholder embeddings.
pub const PLACEHOLDER_DIMS: usize = 1536;

/// Turns text into an embedding vector.
pub trait Embedder: Send + Sync {
    /// Returns the model identifier.
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a single text.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Zero vector of fixed length, whatever the input.
pub struct PlaceholderEmbedder {
    dims: usize,
}

impl PlaceholderEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for PlaceholderEmbedder {
    fn default() -> Self {
        Self::new(PLACEHOLDER_DIMS)
    }
}

impl Embedder for PlaceholderEmbedder {
    fn model_name(&self) -> &str {
        "placeholder"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    fn embed(&self, _text: &str) -> Vec<f32> {
        vec![0.0; self.dims]
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and zero
/// vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

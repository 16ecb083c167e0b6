use crate::types::{ExtractedEntities, IndexHit};

/// Produces query embeddings. Callers embed; the ranking core only sees vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Nearest-neighbour search over code embeddings.
pub trait VectorIndex: Send + Sync {
    fn search_vec(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>>;
}

/// Optional clinical entity extraction over the raw query text.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> anyhow::Result<ExtractedEntities>;
}

impl<T: VectorIndex + ?Sized> VectorIndex for &T {
    fn search_vec(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>> {
        (**self).search_vec(query_vec, k)
    }
}

impl<T: VectorIndex + ?Sized> VectorIndex for Box<T> {
    fn search_vec(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>> {
        (**self).search_vec(query_vec, k)
    }
}

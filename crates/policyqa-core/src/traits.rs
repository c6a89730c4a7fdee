use async_trait::async_trait;

use crate::error::{GenerationError, Result};
use crate::types::{CompletionRequest, IndexHit, IndexRecord};

/// Turns text into fixed-dimension vectors.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_many(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::Embedding("embedder returned no vector".into()))
    }
}

/// Nearest-neighbour store keyed by chunk id.
///
/// `upsert` replaces rows whose id already exists. `query` returns at most `k`
/// hits ordered by ascending cosine distance.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>>;
    async fn count(&self) -> Result<usize>;
    async fn reset(&self) -> Result<()>;
}

/// Chat-completion style text generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier used for requests (reported by `stats`).
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, GenerationError>;
}

use std::sync::Arc;

use tracing::debug;

use policyqa_core::error::Result;
use policyqa_core::traits::{Embedder, VectorIndex};
use policyqa_core::types::RetrievalResult;

/// Embeds a query and asks the index for its nearest chunks.
#[derive(Clone)]
pub struct RetrievalGateway {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl RetrievalGateway {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// At most `k` results, highest similarity first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let vector = self.embedder.embed_one(query)?;
        let mut results: Vec<RetrievalResult> = self
            .index
            .query(&vector, k)
            .await?
            .into_iter()
            .map(|hit| hit.into_result())
            .collect();
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(k);
        debug!(k, hits = results.len(), top_similarity = results.first().map(|r| r.similarity), "retrieved");
        Ok(results)
    }
}

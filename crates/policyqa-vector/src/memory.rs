use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use policyqa_core::error::{Error, Result};
use policyqa_core::traits::VectorIndex;
use policyqa_core::types::{IndexHit, IndexRecord};

/// Brute-force cosine index held in memory, keyed by chunk id.
pub struct MemoryIndex {
    dim: usize,
    rows: RwLock<BTreeMap<String, IndexRecord>>,
}

impl MemoryIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, rows: RwLock::new(BTreeMap::new()) }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dim) {
            return Err(Error::Retrieval(format!(
                "chunk {} has a {}-dim vector, index expects {}",
                bad.id,
                bad.vector.len(),
                self.dim
            )));
        }
        let mut rows = self.rows.write().await;
        for r in records {
            rows.insert(r.id.clone(), r.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if vector.len() != self.dim {
            return Err(Error::Retrieval(format!(
                "query vector has {} dims, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        let rows = self.rows.read().await;
        let mut hits: Vec<IndexHit> = rows
            .values()
            .map(|r| IndexHit {
                id: r.id.clone(),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                distance: 1.0 - cosine_similarity(vector, &r.vector),
            })
            .collect();
        // stable sort keeps id order among equal distances
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.read().await.len())
    }

    async fn reset(&self) -> Result<()> {
        self.rows.write().await.clear();
        Ok(())
    }
}

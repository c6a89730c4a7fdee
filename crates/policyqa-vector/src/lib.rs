//! Vector index adapters.
//!
//! [`LanceIndex`] persists chunk rows in a LanceDB table and answers cosine
//! nearest-neighbour queries. [`MemoryIndex`] keeps everything in process and is
//! used by tests and throwaway runs.

pub mod memory;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::{debug, info};

use policyqa_core::config::{IndexBackend, IndexSettings};
use policyqa_core::error::{Error, Result};
use policyqa_core::traits::VectorIndex;
use policyqa_core::types::{IndexHit, IndexRecord};

pub use memory::MemoryIndex;

use crate::search::batch_to_hits;
use crate::table::{open_chunk_table, open_db};
use crate::writer::records_to_batch;

pub struct LanceIndex {
    _db: Connection,
    table: Table,
    table_name: String,
    dim: i32,
}

impl LanceIndex {
    pub async fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::retrieval)?;
        }
        let db = open_db(&db_path.to_string_lossy()).await?;
        let table = open_chunk_table(&db, table_name, dim).await?;
        info!(path = %db_path.display(), table = table_name, dim, "opened lancedb index");
        Ok(Self { _db: db, table, table_name: table_name.to_string(), dim: dim as i32 })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

/// Drop repeated ids, keeping the last occurrence. merge_insert rejects a
/// source batch that matches the same target row twice.
fn dedup_last(records: &[IndexRecord]) -> Vec<IndexRecord> {
    let mut seen = HashSet::new();
    let mut out: Vec<IndexRecord> = records
        .iter()
        .rev()
        .filter(|r| seen.insert(r.id.as_str()))
        .cloned()
        .collect();
    out.reverse();
    out
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let records = dedup_last(records);
        let batch = records_to_batch(&records, self.dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        // Upsert behavior via merge_insert: id is unique
        let mut mi = self.table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await.map_err(Error::retrieval)?;
        debug!(rows = records.len(), table = %self.table_name, "upserted");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }
        let mut stream = self
            .table
            .vector_search(vector.to_vec())
            .map_err(Error::retrieval)?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(Error::retrieval)?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::retrieval)? {
            hits.extend(batch_to_hits(&batch)?);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(Error::retrieval)
    }

    async fn reset(&self) -> Result<()> {
        self.table.delete("true").await.map_err(Error::retrieval)?;
        info!(table = %self.table_name, "cleared vector table");
        Ok(())
    }
}

/// Index selected by `settings.backend`. `db_path` is the resolved location of
/// the LanceDB directory.
pub async fn open_index(settings: &IndexSettings, db_path: &Path, dim: usize) -> Result<Arc<dyn VectorIndex>> {
    match settings.backend {
        IndexBackend::Lancedb => Ok(Arc::new(LanceIndex::open(db_path, &settings.table, dim).await?)),
        IndexBackend::Memory => Ok(Arc::new(MemoryIndex::new(dim))),
    }
}

//! Batch embedding and index population.

use std::collections::HashSet;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use policyqa_core::data_processor::SkippedFile;
use policyqa_core::error::{Error, Result};
use policyqa_core::traits::{Embedder, VectorIndex};
use policyqa_core::types::{Chunk, IndexRecord};

#[derive(Debug, Default)]
pub struct IngestReport {
    pub files_processed: usize,
    pub skipped: Vec<SkippedFile>,
    /// Chunks produced by the chunker, before id deduplication.
    pub chunks_built: usize,
    /// Rows written to the index.
    pub chunks_indexed: usize,
    pub total_in_index: usize,
}

/// Keep the last chunk for every id, preserving the order of those survivors.
pub fn dedup_by_id(chunks: &[Chunk]) -> Vec<&Chunk> {
    let mut seen = HashSet::new();
    let mut kept: Vec<&Chunk> = chunks.iter().rev().filter(|c| seen.insert(c.id.as_str())).collect();
    kept.reverse();
    kept
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Embed `chunks` in batches of `batch_size` and upsert each batch.
///
/// Returns the number of rows written. Chunks sharing an id collapse to the
/// last one.
pub async fn index_chunks(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".into()));
    }
    let unique = dedup_by_id(chunks);
    if unique.is_empty() {
        info!("no chunks to index");
        return Ok(0);
    }
    if unique.len() < chunks.len() {
        debug!(dropped = chunks.len() - unique.len(), "chunks with duplicate ids collapsed");
    }

    let pb = progress_bar(unique.len());
    let mut written = 0usize;
    for batch in unique.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_many(&texts)?;
        if vectors.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        let records: Vec<IndexRecord> = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexRecord::from_chunk(chunk, vector))
            .collect();
        index.upsert(&records).await?;
        written += records.len();
        pb.set_position(written as u64);
    }
    pb.finish_with_message("indexed");
    info!(chunks = written, "index updated");
    Ok(written)
}

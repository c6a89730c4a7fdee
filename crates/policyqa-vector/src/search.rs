use arrow_array::{Array, Float32Array, RecordBatch, StringArray};

use policyqa_core::error::{Error, Result};
use policyqa_core::types::{ChunkMetadata, IndexHit};

use crate::schema::DISTANCE_COLUMN;

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Retrieval(format!("result column '{name}' missing or not utf8")))
}

/// Convert one result batch of a vector query into hits.
pub fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<IndexHit>> {
    let ids = string_column(batch, "id")?;
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;
    let doc_ids = string_column(batch, "doc_id")?;
    let headings = string_column(batch, "heading")?;
    let paths = string_column(batch, "file_path")?;
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| Error::Retrieval(format!("result column '{DISTANCE_COLUMN}' missing")))?;

    Ok((0..batch.num_rows())
        .map(|i| {
            let heading = headings.value(i);
            IndexHit {
                id: ids.value(i).to_string(),
                content: contents.value(i).to_string(),
                metadata: ChunkMetadata {
                    source: sources.value(i).to_string(),
                    doc_id: doc_ids.value(i).to_string(),
                    heading: (!heading.is_empty()).then(|| heading.to_string()),
                    file_path: paths.value(i).to_string(),
                },
                distance: distances.value(i),
            }
        })
        .collect())
}

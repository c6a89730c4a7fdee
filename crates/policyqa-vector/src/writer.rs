use arrow_array::{FixedSizeListArray, RecordBatch, StringArray};
use std::sync::Arc;

use policyqa_core::error::{Error, Result};
use policyqa_core::types::IndexRecord;

use crate::schema::build_arrow_schema;

pub fn records_to_batch(records: &[IndexRecord], dim: i32) -> Result<RecordBatch> {
    if let Some(bad) = records.iter().find(|r| r.vector.len() != dim as usize) {
        return Err(Error::Retrieval(format!(
            "chunk {} has a {}-dim vector, index expects {dim}",
            bad.id,
            bad.vector.len()
        )));
    }
    let strings = |f: fn(&IndexRecord) -> &str| StringArray::from_iter_values(records.iter().map(f));
    let vectors = records.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

    RecordBatch::try_new(
        build_arrow_schema(dim),
        vec![
            Arc::new(strings(|r| r.id.as_str())),
            Arc::new(strings(|r| r.content.as_str())),
            Arc::new(strings(|r| r.metadata.source.as_str())),
            Arc::new(strings(|r| r.metadata.doc_id.as_str())),
            Arc::new(strings(|r| r.metadata.heading.as_deref().unwrap_or(""))),
            Arc::new(strings(|r| r.metadata.file_path.as_str())),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim)),
        ],
    )
    .map_err(Error::retrieval)
}

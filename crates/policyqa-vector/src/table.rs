//! LanceDB connection and table helpers.

use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};
use std::sync::Arc;
use tracing::info;

use policyqa_core::error::{Error, Result};

use crate::schema::{build_arrow_schema, vector_dim};

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(Error::retrieval)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    let names = conn.table_names().execute().await.map_err(Error::retrieval)?;
    if names.iter().any(|n| n == name) {
        return Ok(());
    }
    // create empty table with 0 rows
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
    conn.create_table(name, Box::new(iter)).execute().await.map_err(Error::retrieval)?;
    info!(table = name, "created vector table");
    Ok(())
}

/// Open (creating if needed) the chunk table and check its vector width.
pub async fn open_chunk_table(conn: &Connection, name: &str, dim: usize) -> Result<Table> {
    let dim = i32::try_from(dim).map_err(|_| Error::InvalidConfig(format!("embedding dimension {dim} too large")))?;
    ensure_table(conn, name, build_arrow_schema(dim)).await?;
    let table = conn.open_table(name).execute().await.map_err(Error::retrieval)?;
    let schema = table.schema().await.map_err(Error::retrieval)?;
    match vector_dim(&schema) {
        Some(stored) if stored == dim => Ok(table),
        Some(stored) => Err(Error::Retrieval(format!(
            "table '{name}' stores {stored}-dim vectors but the embedder produces {dim}; remove the index directory and re-ingest"
        ))),
        None => Err(Error::Retrieval(format!("table '{name}' has no vector column"))),
    }
}

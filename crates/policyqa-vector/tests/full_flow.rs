use policyqa_core::config::{IndexBackend, IndexSettings};
use policyqa_core::error::Error;
use policyqa_core::traits::VectorIndex;
use policyqa_core::types::{ChunkMetadata, IndexRecord};
use policyqa_vector::{open_index, LanceIndex, MemoryIndex};
use tempfile::TempDir;

fn record(id: &str, doc_id: &str, heading: Option<&str>, vector: [f32; 4]) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        vector: vector.to_vec(),
        content: format!("content of {id}"),
        metadata: ChunkMetadata {
            source: format!("{}.md", doc_id.to_lowercase()),
            doc_id: doc_id.to_string(),
            heading: heading.map(str::to_string),
            file_path: format!("/policies/{}.md", doc_id.to_lowercase()),
        },
    }
}

fn corpus() -> Vec<IndexRecord> {
    vec![
        record("a", "POL-1", Some("PTO"), [1.0, 0.0, 0.0, 0.0]),
        record("b", "POL-1", None, [0.8, 0.6, 0.0, 0.0]),
        record("c", "POL-2", Some("Travel"), [0.6, 0.8, 0.0, 0.0]),
        record("d", "POL-3", None, [0.0, 0.0, 0.0, 1.0]),
    ]
}

async fn exercise(index: &dyn VectorIndex) {
    assert_eq!(index.count().await.unwrap(), 0);
    assert!(index.query(&[1.0, 0.0, 0.0, 0.0], 3).await.unwrap().is_empty());

    index.upsert(&corpus()).await.expect("upsert");
    assert_eq!(index.count().await.unwrap(), 4);

    let hits = index.query(&[1.0, 0.0, 0.0, 0.0], 3).await.expect("query");
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
    assert!(hits[0].distance.abs() < 1e-4);
    assert!((hits[1].distance - 0.2).abs() < 1e-4);
    assert_eq!(hits[0].metadata.heading.as_deref(), Some("PTO"));
    assert_eq!(hits[1].metadata.heading, None);
    assert_eq!(hits[0].metadata.doc_id, "POL-1");
    assert_eq!(hits[0].content, "content of a");

    // same id again replaces the row
    let mut moved = record("d", "POL-3", None, [1.0, 0.0, 0.0, 0.0]);
    moved.content = "rewritten".to_string();
    index.upsert(&[moved]).await.expect("re-upsert");
    assert_eq!(index.count().await.unwrap(), 4);
    let top = &index.query(&[1.0, 0.0, 0.0, 0.0], 4).await.unwrap()[..2];
    assert!(top.iter().any(|h| h.id == "d" && h.content == "rewritten"));

    index.reset().await.expect("reset");
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn memory_index_upsert_query_reset() {
    exercise(&MemoryIndex::new(4)).await;
}

#[tokio::test]
async fn lancedb_index_upsert_query_reset() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(&tmp.path().join("index"), "policies_test", 4).await.expect("open");
    exercise(&index).await;
}

#[tokio::test]
async fn lancedb_index_persists_between_opens() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("index");
    {
        let index = LanceIndex::open(&path, "policies", 4).await.expect("open");
        index.upsert(&corpus()).await.expect("upsert");
    }
    let reopened = LanceIndex::open(&path, "policies", 4).await.expect("reopen");
    assert_eq!(reopened.count().await.unwrap(), 4);

    let err = LanceIndex::open(&path, "policies", 8).await.err().expect("dim mismatch");
    assert!(matches!(err, Error::Retrieval(_)));
}

#[tokio::test]
async fn duplicate_ids_in_one_batch_keep_last() {
    let tmp = TempDir::new().expect("tmp");
    let index = LanceIndex::open(&tmp.path().join("index"), "policies", 4).await.expect("open");
    let mut second = record("a", "POL-1", None, [0.0, 1.0, 0.0, 0.0]);
    second.content = "second".to_string();
    index.upsert(&[record("a", "POL-1", None, [1.0, 0.0, 0.0, 0.0]), second]).await.expect("upsert");

    assert_eq!(index.count().await.unwrap(), 1);
    let hits = index.query(&[0.0, 1.0, 0.0, 0.0], 1).await.unwrap();
    assert_eq!(hits[0].content, "second");
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let index = MemoryIndex::new(4);
    let mut bad = record("x", "POL-9", None, [1.0, 0.0, 0.0, 0.0]);
    bad.vector.push(0.5);
    assert!(matches!(index.upsert(&[bad]).await, Err(Error::Retrieval(_))));
    assert!(index.query(&[1.0, 0.0], 1).await.is_err());
}

#[tokio::test]
async fn backend_setting_selects_index() {
    let tmp = TempDir::new().expect("tmp");
    let settings = IndexSettings { backend: IndexBackend::Memory, ..IndexSettings::default() };
    let index = open_index(&settings, &tmp.path().join("unused"), 4).await.expect("memory");
    index.upsert(&corpus()).await.unwrap();
    assert_eq!(index.count().await.unwrap(), 4);
    assert!(!tmp.path().join("unused").exists());
}

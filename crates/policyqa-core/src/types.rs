//! Domain types shared by the chunker, the index adapters and the answer pipeline.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Number of leading characters that take part in a chunk's identity.
pub const ID_PREFIX_CHARS: usize = 100;

/// Which part of a chunk's content feeds its identifier.
///
/// `Leading` hashes `source` plus the first [`ID_PREFIX_CHARS`] characters, so
/// two chunks of the same file that open with the same text share an id and
/// the second one overwrites the first on upsert. `Full` hashes the whole
/// content and only collapses exact duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScope {
    #[default]
    Leading,
    Full,
}

/// Provenance attached to every chunk.
///
/// - `source`: file name the chunk came from (e.g. `pto_policy.md`)
/// - `doc_id`: policy identifier (`POL-001`) or the upper-cased file stem
/// - `heading`: nearest level 1-2 heading for structured documents
/// - `file_path`: path of the originating file as it was read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub doc_id: String,
    pub heading: Option<String>,
    pub file_path: String,
}

/// A retrieval unit: a trimmed span of document text plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata, scope: IdScope) -> Self {
        let content = content.into();
        let id = chunk_id(&metadata.source, &content, scope);
        Self { id, content, metadata }
    }
}

/// Deterministic chunk identifier (blake3 hex of `source:content-key`).
pub fn chunk_id(source: &str, content: &str, scope: IdScope) -> ChunkId {
    let key: String = match scope {
        IdScope::Leading => content.chars().take(ID_PREFIX_CHARS).collect(),
        IdScope::Full => content.to_string(),
    };
    blake3::hash(format!("{source}:{key}").as_bytes()).to_hex().to_string()
}

/// One ranked hit. Higher `similarity` is better; lists are kept in
/// non-increasing similarity order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Row handed to a [`crate::traits::VectorIndex`] on upsert.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: ChunkId,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl IndexRecord {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            vector,
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
        }
    }
}

/// Raw nearest-neighbour hit. `distance` is cosine distance (`1 - cos`).
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub id: ChunkId,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

impl IndexHit {
    pub fn into_result(self) -> RetrievalResult {
        RetrievalResult {
            similarity: 1.0 - self.distance,
            chunk: Chunk { id: self.id, content: self.content, metadata: self.metadata },
        }
    }
}

/// A cited document in a [`Response`]. Unique per `(doc_id, source)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub doc_id: String,
    pub source: String,
    pub heading: Option<String>,
    pub similarity: f32,
}

/// Terminal state of a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Answered,
    Refused,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub retrieved_chunks: Vec<String>,
    pub confidence: f32,
    #[serde(default)]
    pub outcome: Outcome,
}

impl Response {
    /// Response with no evidence attached (refusals and provider failures).
    pub fn empty(answer: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            retrieved_chunks: Vec::new(),
            confidence: 0.0,
            outcome,
        }
    }
}

/// Parameters of a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub embedding_dim: usize,
}

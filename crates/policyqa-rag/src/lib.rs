//! Retrieval-augmented answering over company policy documents.
//!
//! A question is embedded, matched against the index, gated on the best
//! similarity and only then sent to the language model together with the
//! retrieved context.

pub mod citations;
pub mod composer;
pub mod grounding;
pub mod ingest;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;

pub use citations::{check_citations, parse_citations, Citation, CitationReport};
pub use composer::AnswerComposer;
pub use grounding::{GateDecision, GroundingGate};
pub use ingest::IngestReport;
pub use pipeline::{CorpusIndex, PipelineStats, PolicyQa};
pub use retrieval::RetrievalGateway;

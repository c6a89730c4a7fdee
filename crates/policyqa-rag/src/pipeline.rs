use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use policyqa_core::config::{Config, Settings};
use policyqa_core::data_processor::DataProcessor;
use policyqa_core::error::Result;
use policyqa_core::traits::{Embedder, Generator, VectorIndex};
use policyqa_core::types::{IndexStats, Outcome, Response, RetrievalResult};
use policyqa_embed::load_embedder;
use policyqa_llm::LlmClient;
use policyqa_vector::open_index;

use crate::composer::AnswerComposer;
use crate::grounding::{GateDecision, GroundingGate};
use crate::ingest::{index_chunks, IngestReport};
use crate::prompts::REFUSAL_MESSAGE;
use crate::retrieval::RetrievalGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total_chunks: usize,
    pub embedding_dim: usize,
    pub model: String,
}

/// The indexed corpus: chunking, embedding, and the vector index.
///
/// Needs no language model, so ingestion and raw search work without
/// provider credentials.
pub struct CorpusIndex {
    processor: DataProcessor,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    retrieval: RetrievalGateway,
    batch_size: usize,
}

impl CorpusIndex {
    pub fn new(settings: &Settings, embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            processor: DataProcessor::new(settings.chunking.clone())?,
            retrieval: RetrievalGateway::new(embedder.clone(), index.clone()),
            embedder,
            index,
            batch_size: settings.embedding.batch_size,
        })
    }

    /// Load the configured embedder and open the configured index.
    pub async fn from_config(config: &Config, settings: &Settings) -> Result<Self> {
        let model_dir = settings.embedding.model_dir.as_deref().map(|p| config.resolve_path(p));
        let embedder: Arc<dyn Embedder> = Arc::from(load_embedder(&settings.embedding, model_dir)?);
        let db_path = config.resolve_path(&settings.index.db_path);
        let index = open_index(&settings.index, &db_path, embedder.dim()).await?;
        Self::new(settings, embedder, index)
    }

    pub fn retrieval(&self) -> &RetrievalGateway {
        &self.retrieval
    }

    /// Raw ranked retrieval, without gating or generation.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        self.retrieval.retrieve(query, k).await
    }

    /// Chunk every supported file under `dir` and upsert it into the index.
    pub async fn ingest(&self, dir: &Path) -> Result<IngestReport> {
        let corpus = self.processor.process_directory(dir)?;
        let chunks_indexed =
            index_chunks(self.embedder.as_ref(), self.index.as_ref(), &corpus.chunks, self.batch_size).await?;
        let total_in_index = self.index.count().await?;
        info!(
            files = corpus.files_processed,
            skipped = corpus.skipped.len(),
            chunks = chunks_indexed,
            total = total_in_index,
            "ingestion finished"
        );
        Ok(IngestReport {
            files_processed: corpus.files_processed,
            skipped: corpus.skipped,
            chunks_built: corpus.chunks.len(),
            chunks_indexed,
            total_in_index,
        })
    }

    /// Ingest `dir` only when the index holds nothing yet.
    pub async fn ensure_indexed(&self, dir: &Path) -> Result<Option<IngestReport>> {
        let count = self.index.count().await?;
        if count > 0 {
            debug!(count, "index already populated");
            return Ok(None);
        }
        info!(dir = %dir.display(), "index is empty; ingesting");
        self.ingest(dir).await.map(Some)
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats { total_chunks: self.index.count().await?, embedding_dim: self.embedder.dim() })
    }

    pub async fn reset(&self) -> Result<()> {
        self.index.reset().await
    }
}

/// Question answering over an indexed policy corpus.
///
/// Build it once and share it by reference. Answering only reads the index;
/// ingestion and reset write to it and must not overlap with each other.
pub struct PolicyQa {
    corpus: CorpusIndex,
    gate: GroundingGate,
    composer: AnswerComposer,
    top_k: usize,
}

impl PolicyQa {
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let corpus = CorpusIndex::new(settings, embedder, index)?;
        Ok(Self::with_corpus(settings, corpus, generator))
    }

    pub fn with_corpus(settings: &Settings, corpus: CorpusIndex, generator: Arc<dyn Generator>) -> Self {
        let generation = &settings.generation;
        Self {
            corpus,
            gate: GroundingGate::new(settings.retrieval.similarity_threshold),
            composer: AnswerComposer::new(generator, generation.temperature, generation.max_tokens),
            top_k: settings.retrieval.top_k,
        }
    }

    /// Wire up the configured provider, embedder and index. The provider is
    /// checked first so bad credentials fail before any model is loaded.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let settings = config.settings()?;
        let generator: Arc<dyn Generator> = Arc::new(LlmClient::from_settings(&settings.generation)?);
        let corpus = CorpusIndex::from_config(config, &settings).await?;
        Ok(Self::with_corpus(&settings, corpus, generator))
    }

    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn answer(&self, question: &str) -> Result<Response> {
        self.answer_with_k(question, self.top_k).await
    }

    /// Retrieve `k` chunks, refuse if the best one is not relevant enough,
    /// otherwise generate a cited answer.
    pub async fn answer_with_k(&self, question: &str, k: usize) -> Result<Response> {
        let question = question.trim();
        if question.is_empty() || k == 0 {
            return Ok(Response::empty(REFUSAL_MESSAGE, Outcome::Refused));
        }

        let results = self.corpus.search(question, k).await?;
        match self.gate.gate(results) {
            GateDecision::Refuse => {
                debug!(threshold = self.gate.threshold(), "no chunk above threshold; refusing");
                Ok(Response::empty(REFUSAL_MESSAGE, Outcome::Refused))
            }
            GateDecision::Proceed(results) => Ok(self.composer.compose(question, &results).await),
        }
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        self.corpus.search(query, k).await
    }

    pub async fn ingest(&self, dir: &Path) -> Result<IngestReport> {
        self.corpus.ingest(dir).await
    }

    pub async fn ensure_indexed(&self, dir: &Path) -> Result<Option<IngestReport>> {
        self.corpus.ensure_indexed(dir).await
    }

    pub async fn stats(&self) -> Result<PipelineStats> {
        let index = self.corpus.stats().await?;
        Ok(PipelineStats {
            total_chunks: index.total_chunks,
            embedding_dim: index.embedding_dim,
            model: self.composer.model().to_string(),
        })
    }

    pub async fn reset(&self) -> Result<()> {
        self.corpus.reset().await
    }
}

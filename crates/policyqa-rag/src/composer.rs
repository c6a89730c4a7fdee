use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use policyqa_core::traits::Generator;
use policyqa_core::types::{CompletionRequest, Outcome, Response, RetrievalResult, SourceRef};

use crate::prompts::{build_user_prompt, format_context, SYSTEM_PROMPT};

/// Turns gated retrieval results into an answer.
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>, temperature: f32, max_tokens: u32) -> Self {
        Self { generator, temperature, max_tokens }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    /// Provider failures come back as a degraded [`Response`], never as an error.
    pub async fn compose(&self, query: &str, results: &[RetrievalResult]) -> Response {
        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(query, &format_context(results)),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match self.generator.complete(&request).await {
            Ok(answer) => {
                debug!(chars = answer.len(), contexts = results.len(), "answer generated");
                Response {
                    answer,
                    sources: extract_sources(results),
                    retrieved_chunks: results.iter().map(|r| r.chunk.content.clone()).collect(),
                    confidence: mean_similarity(results),
                    outcome: Outcome::Answered,
                }
            }
            Err(e) => {
                warn!(error = %e, model = self.generator.model(), "generation failed; returning degraded answer");
                Response::empty(format!("An error occurred while generating the answer: {e}"), Outcome::Degraded)
            }
        }
    }
}

/// One entry per `(doc_id, source)`, in first-seen rank order.
pub fn extract_sources(results: &[RetrievalResult]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert((r.chunk.metadata.doc_id.as_str(), r.chunk.metadata.source.as_str())))
        .map(|r| SourceRef {
            doc_id: r.chunk.metadata.doc_id.clone(),
            source: r.chunk.metadata.source.clone(),
            heading: r.chunk.metadata.heading.clone(),
            similarity: r.similarity,
        })
        .collect()
}

pub fn mean_similarity(results: &[RetrievalResult]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.similarity).sum::<f32>() / results.len() as f32
}

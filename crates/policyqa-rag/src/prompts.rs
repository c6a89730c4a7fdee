//! Instruction contract and context layout for the generation request.

use std::fmt::Write;

use policyqa_core::types::RetrievalResult;

/// Sentence returned when the documents do not cover the question.
pub const REFUSAL_MESSAGE: &str = "I can only answer questions about our company policies. \
This information is not available in the policy documents I have access to.";

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about company policies.

IMPORTANT GUIDELINES:
1. ONLY answer questions based on the provided policy documents
2. If the answer is not in the provided context, say \"I can only answer questions about our company policies. This information is not available in the policy documents I have access to.\"
3. Always cite your sources using the Document ID and source filename
4. Be concise and direct in your answers
5. If you're unsure, say so rather than making up information
6. Include specific details like numbers, dates, and requirements when available in the context

When answering:
- Start with a direct answer to the question
- Provide relevant details from the policy documents
- End with citations in the format: [Source: document_name, Doc ID: POL-XXX]
";

const CONTEXT_SEPARATOR: &str = "\n---\n";

/// One block per result, numbered from 1 in rank order.
pub fn format_context(results: &[RetrievalResult]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let meta = &r.chunk.metadata;
            let mut block = String::new();
            let _ = write!(
                block,
                "\nDocument {}:\nSource: {}\nDocument ID: {}\nSection: {}\nSimilarity: {:.3}\n\nContent:\n{}\n",
                i + 1,
                meta.source,
                meta.doc_id,
                meta.heading.as_deref().unwrap_or("N/A"),
                r.similarity,
                r.chunk.content
            );
            block
        })
        .collect();
    blocks.join(CONTEXT_SEPARATOR)
}

pub fn build_user_prompt(query: &str, context: &str) -> String {
    format!(
        "Based on the following policy documents, please answer this question:\n\n\
         Question: {query}\n\n\
         Policy Documents:\n{context}\n\n\
         Remember to cite your sources and only use information from the provided documents."
    )
}

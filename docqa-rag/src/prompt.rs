//! Context assembly and prompt construction.

use serde::{Deserialize, Serialize};

use crate::document::{Metadata, ScoredResult};
use crate::generation::Turn;

/// Answer returned when retrieval finds nothing to ground a response in.
pub const NO_CONTEXT_ANSWER: &str = "I couldn't find any relevant information to answer your question. \
Please try uploading more documents or rephrasing your question.";

/// Instruction turn that confines the model to the supplied context.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant that answers questions based on the provided context.

Instructions:
- Answer the question using ONLY the information provided in the context below
- Be concise and accurate
- If the context doesn't contain enough information to answer the question, say \"I don't have enough information to answer that question based on the provided documents.\"
- Do not make up information or use knowledge outside of the provided context
- If appropriate, cite which document or source the information comes from";

/// Maximum characters of chunk text echoed back in a source excerpt.
pub const EXCERPT_CHARS: usize = 500;

const UNKNOWN_SOURCE: &str = "Unknown";

/// Concatenate results into a context block, best first.
///
/// Each entry is headed `[Document N - Source: S]` with a 1-based ordinal;
/// entries are separated by a blank line.
pub fn format_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let source = result.source().unwrap_or(UNKNOWN_SOURCE);
            format!("[Document {} - Source: {source}]\n{}", i + 1, result.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the two-turn conversation sent to the model.
pub fn build_turns(question: &str, context: &str) -> Vec<Turn> {
    let user = format!(
        "Context:\n{context}\n\nQuestion: {question}\n\n\
         Please provide a clear and accurate answer based on the context above."
    );
    vec![Turn::system(SYSTEM_INSTRUCTION), Turn::user(user)]
}

/// A retrieved chunk as reported back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceExcerpt {
    /// The chunk text, cut to [`EXCERPT_CHARS`] characters plus `...`.
    pub text: String,
    /// The chunk's full metadata.
    pub metadata: Metadata,
    /// Relevance score rounded to three decimals.
    pub relevance_score: f32,
}

impl From<&ScoredResult> for SourceExcerpt {
    fn from(result: &ScoredResult) -> Self {
        Self {
            text: truncate_chars(&result.text, EXCERPT_CHARS),
            metadata: result.metadata.clone(),
            relevance_score: round3(result.relevance_score),
        }
    }
}

/// Cut `text` to `max` characters, appending `...` when anything was removed.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

//! RAG (Retrieval-Augmented Generation) for medical question answering.
//!
//! A query is embedded, matched against the vector index, resolved to
//! document text through the corpus and handed to the language model
//! together with the user's question.

pub mod context;
mod response;

pub use context::ContextBuilder;
pub use response::{RagEngine, RagResponse};

use crate::corpus::ResultItem;
use crate::vector_store::SearchResult;

/// A retrieved document with its ranking data.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    /// Id, summary and full text as reported to clients.
    pub item: ResultItem,
    /// Similarity score.
    pub score: f32,
    /// Index row the hit came from.
    pub row: usize,
    /// Whether the full text came from the corpus rather than the placeholder.
    pub has_full_text: bool,
}

impl RetrievedDocument {
    pub fn new(hit: &SearchResult, item: ResultItem, has_full_text: bool) -> Self {
        Self {
            item,
            score: hit.score,
            row: hit.row,
            has_full_text,
        }
    }
}

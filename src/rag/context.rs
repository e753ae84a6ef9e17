//! Context building for RAG prompts.

use super::RetrievedDocument;
use std::collections::HashSet;

/// Separator placed between documents in the context block.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Builds the context block from retrieved documents.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    dedup: bool,
    max_chars: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    /// Create a builder with dedup on and no size limit.
    pub fn new() -> Self {
        Self {
            dedup: true,
            max_chars: 0,
        }
    }

    /// Include each document id at most once.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    /// Set the character budget (0 = unlimited).
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Join full texts in retrieval order.
    ///
    /// Documents without a full text contribute nothing. Under a budget,
    /// trailing documents are dropped whole; only a lone oversized first
    /// document is cut.
    pub fn build(&self, documents: &[RetrievedDocument]) -> String {
        let mut seen = HashSet::new();
        let texts = documents
            .iter()
            .filter(|d| d.has_full_text)
            .filter(|d| !self.dedup || seen.insert(d.item.id.as_str()))
            .map(|d| d.item.full_text.as_str());

        if self.max_chars == 0 {
            return texts.collect::<Vec<_>>().join(DOCUMENT_SEPARATOR);
        }

        let separator_chars = DOCUMENT_SEPARATOR.chars().count();
        let mut parts: Vec<&str> = Vec::new();
        let mut used = 0;

        for text in texts {
            let cost = text.chars().count() + if parts.is_empty() { 0 } else { separator_chars };
            if used + cost <= self.max_chars {
                parts.push(text);
                used += cost;
            } else {
                if parts.is_empty() {
                    return truncate_chars(text, self.max_chars).to_string();
                }
                break;
            }
        }

        parts.join(DOCUMENT_SEPARATOR)
    }
}

/// Cut a string to at most `max_chars` characters on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

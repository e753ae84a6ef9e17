//! Side-loaded document text keyed by id.
//!
//! Two JSON objects map document ids to their summary and full text. Both
//! are read once at startup and never mutated afterwards.

use crate::error::{MedragError, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// A retrieved document as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    pub id: String,
    pub summary: String,
    pub full_text: String,
}

/// Summary and full-text lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    summaries: HashMap<String, String>,
    fulltexts: HashMap<String, String>,
    placeholder: String,
}

impl Corpus {
    /// Build a corpus from in-memory tables.
    pub fn new(
        summaries: HashMap<String, String>,
        fulltexts: HashMap<String, String>,
        placeholder: &str,
    ) -> Self {
        Self {
            summaries,
            fulltexts,
            placeholder: placeholder.to_string(),
        }
    }

    /// Load both tables from disk.
    pub fn load(summary_path: &Path, fulltext_path: &Path, placeholder: &str) -> Result<Self> {
        let summaries = load_table(summary_path)?;
        let fulltexts = load_table(fulltext_path)?;
        debug!(
            "Loaded {} summaries and {} full texts",
            summaries.len(),
            fulltexts.len()
        );
        Ok(Self::new(summaries, fulltexts, placeholder))
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn summary(&self, id: &str) -> Option<&str> {
        self.summaries.get(id).map(String::as_str)
    }

    pub fn full_text(&self, id: &str) -> Option<&str> {
        self.fulltexts.get(id).map(String::as_str)
    }

    /// Resolve an id to a result item, substituting the placeholder for gaps.
    pub fn lookup(&self, id: &str) -> ResultItem {
        let summary = self.summary(id);
        let full_text = self.full_text(id);

        if summary.is_none() || full_text.is_none() {
            warn!(
                id,
                has_summary = summary.is_some(),
                has_full_text = full_text.is_some(),
                "Retrieved id missing from lookup tables"
            );
        }

        ResultItem {
            id: id.to_string(),
            summary: summary.unwrap_or(&self.placeholder).to_string(),
            full_text: full_text.unwrap_or(&self.placeholder).to_string(),
        }
    }

    /// Number of distinct ids known to either table.
    pub fn len(&self) -> usize {
        self.summaries
            .keys()
            .chain(self.fulltexts.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.fulltexts.is_empty()
    }

    /// Entries of the full-text table, sorted by id.
    pub fn full_texts_sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .fulltexts
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Entries of the summary table, sorted by id.
    pub fn summaries_sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .summaries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Compare index ids against both tables.
    pub fn coverage(&self, index_ids: &[String]) -> Coverage {
        let mut missing_summary = Vec::new();
        let mut missing_full_text = Vec::new();

        for id in index_ids {
            if !self.summaries.contains_key(id) {
                missing_summary.push(id.clone());
            }
            if !self.fulltexts.contains_key(id) {
                missing_full_text.push(id.clone());
            }
        }

        let indexed: BTreeSet<&str> = index_ids.iter().map(String::as_str).collect();
        let mut unindexed: Vec<String> = self
            .fulltexts
            .keys()
            .filter(|id| !indexed.contains(id.as_str()))
            .cloned()
            .collect();
        unindexed.sort();

        Coverage {
            index_rows: index_ids.len(),
            summaries: self.summaries.len(),
            full_texts: self.fulltexts.len(),
            missing_summary,
            missing_full_text,
            unindexed,
        }
    }
}

/// Data-integrity report between the index id map and the lookup tables.
#[derive(Debug, Clone, Serialize)]
pub struct Coverage {
    pub index_rows: usize,
    pub summaries: usize,
    pub full_texts: usize,
    /// Index ids with no summary, in row order.
    pub missing_summary: Vec<String>,
    /// Index ids with no full text, in row order.
    pub missing_full_text: Vec<String>,
    /// Full-text ids that no index row points at.
    pub unindexed: Vec<String>,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.missing_summary.is_empty() && self.missing_full_text.is_empty()
    }
}

fn load_table(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        MedragError::Corpus(format!("failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        MedragError::Corpus(format!(
            "{} is not a JSON object of strings: {}",
            path.display(),
            e
        ))
    })
}

//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command: retrieval only, no generation.
pub async fn run_search(query: &str, k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.engine();

    let spinner = Output::spinner("Searching...");
    let results = engine.retrieve(query, k).await;
    spinner.finish_and_clear();

    let results = results?;

    if results.is_empty() {
        Output::warning("No matching documents.");
        return Ok(());
    }

    Output::header(&format!("Top {} documents", results.len()));
    for (rank, doc) in results.iter().enumerate() {
        Output::search_result(rank + 1, &doc.item.id, doc.score, &doc.item.summary);
        if !doc.has_full_text {
            Output::warning(&format!("{} has no full text in the corpus", doc.item.id));
        }
    }

    Ok(())
}

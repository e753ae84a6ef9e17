//! Index command: embed the corpus and write the flat index.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::Corpus;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::openai::{api_key, create_client};
use crate::orchestrator::{build_index, IndexSource};
use crate::vector_store::VectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the index command.
pub async fn run_index(source: IndexSource, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::BuildIndex, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let corpus = Corpus::load(
        &settings.summary_path(),
        &settings.fulltext_path(),
        &settings.corpus.placeholder,
    )?;

    let key = api_key(&settings.provider)?;
    let client = create_client(&settings.provider, &key)?;
    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAIEmbedder::new(
            client,
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )
        .with_batch_size(settings.embedding.batch_size),
    );

    let total = match source {
        IndexSource::FullText => corpus.full_texts_sorted().len(),
        IndexSource::Summary => corpus.summaries_sorted().len(),
    };
    if total == 0 {
        Output::warning("Corpus is empty; nothing to index.");
        return Ok(());
    }

    Output::info(&format!(
        "Embedding {} documents with {}",
        total, settings.embedding.model
    ));
    let pb = Output::progress_bar(total as u64, "embedding");

    let index = match build_index(&settings, &corpus, embedder, source, |n| pb.inc(n as u64)).await {
        Ok(index) => {
            pb.finish_and_clear();
            index
        }
        Err(e) => {
            pb.abandon();
            Output::error(&format!("Indexing failed: {}", e));
            return Err(e.into());
        }
    };

    let index_path = settings.index_path();
    let ids_path = settings.index_ids_path();
    index.save(&index_path, &ids_path)?;

    Output::success(&format!(
        "Indexed {} documents ({} dims, {})",
        index.len(),
        index.dimensions(),
        index.metric()
    ));
    Output::kv("Index", &index_path.display().to_string());
    Output::kv("Id map", &ids_path.display().to_string());

    Ok(())
}

//! Check command: data-integrity report between the index and the tables.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::Corpus;
use crate::openai::api_key;
use crate::vector_store::{FlatVectorStore, VectorStore};
use anyhow::Result;
use console::style;

/// Run the check command.
pub fn run_check(sample: usize, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Check, settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let corpus = Corpus::load(
        &settings.summary_path(),
        &settings.fulltext_path(),
        &settings.corpus.placeholder,
    )?;
    let index = FlatVectorStore::load(
        &settings.index_path(),
        &settings.index_ids_path(),
        settings.index.metric,
    )?;

    let report = corpus.coverage(index.ids());

    Output::header("Data files");
    Output::kv("Index rows", &report.index_rows.to_string());
    Output::kv("Index dimensions", &index.dimensions().to_string());
    Output::kv("Summaries", &report.summaries.to_string());
    Output::kv("Full texts", &report.full_texts.to_string());

    Output::header(&format!("First {} index ids", sample.min(index.len())));
    for id in index.ids().iter().take(sample) {
        let mark = |present: bool| {
            if present {
                style("yes").green().to_string()
            } else {
                style("no").red().to_string()
            }
        };
        Output::list_item(&format!(
            "{}  summary: {}  full text: {}",
            id,
            mark(corpus.summary(id).is_some()),
            mark(corpus.full_text(id).is_some())
        ));
    }

    Output::header("Coverage");
    report_gap("Index ids without summary", &report.missing_summary, sample);
    report_gap("Index ids without full text", &report.missing_full_text, sample);
    report_gap("Documents not in the index", &report.unindexed, sample);

    if index.dimensions() != settings.embedding.dimensions as usize && !index.is_empty() {
        Output::warning(&format!(
            "Index has {} dimensions but embedding.dimensions is {}",
            index.dimensions(),
            settings.embedding.dimensions
        ));
    }

    match api_key(&settings.provider) {
        Ok(_) => Output::success(&format!("{} is set", settings.provider.api_key_env)),
        Err(e) => Output::warning(&e.to_string()),
    }

    if report.is_complete() {
        Output::success("Every index id resolves in both tables.");
    } else {
        Output::warning(&format!(
            "Unresolved ids will be answered with {:?}.",
            corpus.placeholder()
        ));
    }

    Ok(())
}

fn report_gap(label: &str, ids: &[String], sample: usize) {
    if ids.is_empty() {
        Output::success(&format!("{}: none", label));
        return;
    }
    Output::warning(&format!("{}: {}", label, ids.len()));
    for id in ids.iter().take(sample) {
        Output::list_item(id);
    }
}

//! Application context for medrag.
//!
//! Everything a request needs is loaded here once, at startup, and shared
//! read-only afterwards. Startup failures (missing API key, unreadable
//! tables, a corrupt index) surface from [`Orchestrator::new`] so the
//! process refuses to start.

use crate::config::{Prompts, Settings};
use crate::corpus::Corpus;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{MedragError, Result};
use crate::generation::{ChatGenerator, Generator};
use crate::openai::{api_key, create_client};
use crate::rag::RagEngine;
use crate::vector_store::{FlatVectorStore, VectorStore};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{info, instrument};

/// Which table the index is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexSource {
    #[default]
    FullText,
    Summary,
}

impl std::str::FromStr for IndexSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fulltext" | "full_text" | "full-text" => Ok(IndexSource::FullText),
            "summary" => Ok(IndexSource::Summary),
            _ => Err(format!("Unknown index source: {}", s)),
        }
    }
}

/// The main orchestrator: owns the RAG engine and its collaborators.
pub struct Orchestrator {
    settings: Settings,
    engine: Arc<RagEngine>,
}

impl Orchestrator {
    /// Load settings-driven collaborators and build the engine.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let key = api_key(&settings.provider)?;
        let client = create_client(&settings.provider, &key)?;

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let corpus = Arc::new(Corpus::load(
            &settings.summary_path(),
            &settings.fulltext_path(),
            &settings.corpus.placeholder,
        )?);

        let vector_store = Arc::new(FlatVectorStore::load(
            &settings.index_path(),
            &settings.index_ids_path(),
            settings.index.metric,
        )?);

        let embedding_dims = settings.embedding.dimensions as usize;
        if !vector_store.is_empty() && vector_store.dimensions() != embedding_dims {
            return Err(MedragError::Config(format!(
                "index has {} dimensions but embedding.dimensions is {}",
                vector_store.dimensions(),
                embedding_dims
            )));
        }

        let embedder = Arc::new(
            OpenAIEmbedder::new(client.clone(), &settings.embedding.model, embedding_dims)
                .with_batch_size(settings.embedding.batch_size),
        );

        let generator = Arc::new(
            ChatGenerator::new(client, &settings.rag.model)
                .with_temperature(settings.rag.temperature),
        );

        info!(
            "Loaded {} index rows, {} documents; model {}",
            vector_store.len(),
            corpus.len(),
            settings.rag.model
        );

        let engine = RagEngine::new(embedder, vector_store, corpus, generator)
            .with_settings(&settings.rag)
            .with_prompts(prompts);

        Ok(Self::with_engine(settings, Arc::new(engine)))
    }

    /// Create an orchestrator around a prebuilt engine.
    pub fn with_engine(settings: Settings, engine: Arc<RagEngine>) -> Self {
        Self { settings, engine }
    }

    pub fn engine(&self) -> Arc<RagEngine> {
        self.engine.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Embed every document of a table and write the flat index to disk.
///
/// Rows follow sorted document ids so rebuilding an unchanged corpus
/// yields an identical index.
#[instrument(skip(settings, corpus, embedder, on_progress))]
pub async fn build_index(
    settings: &Settings,
    corpus: &Corpus,
    embedder: Arc<dyn Embedder>,
    source: IndexSource,
    on_progress: impl Fn(usize) + Send,
) -> Result<FlatVectorStore> {
    let entries = match source {
        IndexSource::FullText => corpus.full_texts_sorted(),
        IndexSource::Summary => corpus.summaries_sorted(),
    };

    let mut index = FlatVectorStore::new(embedder.dimensions(), settings.index.metric);
    if entries.is_empty() {
        return Ok(index);
    }

    let batches: Vec<Vec<String>> = entries
        .chunks(settings.embedding.batch_size.max(1))
        .map(|chunk| chunk.iter().map(|(_, text)| text.to_string()).collect())
        .collect();

    let embeddings: Vec<Vec<Vec<f32>>> = stream::iter(batches)
        .map(|batch| {
            let embedder = embedder.clone();
            let on_progress = &on_progress;
            async move {
                let out = embedder.embed_batch(&batch).await?;
                on_progress(batch.len());
                Ok::<_, MedragError>(out)
            }
        })
        .buffered(2)
        .try_collect()
        .await?;

    for ((id, _), vector) in entries.iter().zip(embeddings.into_iter().flatten()) {
        index.push(id, &vector)?;
    }

    if index.len() != entries.len() {
        return Err(MedragError::Embedding(format!(
            "embedded {} of {} documents",
            index.len(),
            entries.len()
        )));
    }

    info!("Embedded {} documents", index.len());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::embedding::FakeEmbedder;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn corpus() -> Corpus {
        let fulltexts = HashMap::from([
            ("b".to_string(), "covid symptoms".to_string()),
            ("a".to_string(), "flu symptoms".to_string()),
            ("c".to_string(), "unrelated".to_string()),
        ]);
        let summaries = HashMap::from([("a".to_string(), "flu".to_string())]);
        Corpus::new(summaries, fulltexts, "N/A")
    }

    fn embedder() -> Arc<FakeEmbedder> {
        Arc::new(
            FakeEmbedder::new(2)
                .with("flu symptoms", vec![1.0, 0.0])
                .with("covid symptoms", vec![0.8, 0.2])
                .with("unrelated", vec![0.0, 1.0])
                .with("flu", vec![1.0, 0.1]),
        )
    }

    #[tokio::test]
    async fn test_build_index_sorted_rows() {
        let mut settings = Settings::default();
        settings.embedding.batch_size = 2;
        let seen = AtomicUsize::new(0);

        let index = build_index(&settings, &corpus(), embedder(), IndexSource::FullText, |n| {
            seen.fetch_add(n, Ordering::SeqCst);
        })
        .await
        .unwrap();

        assert_eq!(index.ids(), &["a", "b", "c"]);
        assert_eq!(index.vector(1), Some(&[0.8f32, 0.2][..]));
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        let hits = index.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].doc_id, "c");
    }

    #[tokio::test]
    async fn test_build_index_from_summaries() {
        let settings = Settings::default();
        let index = build_index(&settings, &corpus(), embedder(), IndexSource::Summary, |_| {})
            .await
            .unwrap();
        assert_eq!(index.ids(), &["a"]);
    }

    #[tokio::test]
    async fn test_build_index_propagates_embedding_errors() {
        let settings = Settings::default();
        let err = build_index(
            &settings,
            &corpus(),
            Arc::new(FakeEmbedder::new(2).failing()),
            IndexSource::FullText,
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MedragError::Embedding(_)));
    }

    #[test]
    fn test_missing_api_key_refuses_start() {
        let mut settings = Settings::default();
        settings.provider.api_key_env = "MEDRAG_ORCHESTRATOR_TEST_UNSET".to_string();
        assert!(matches!(Orchestrator::new(settings), Err(MedragError::Config(_))));
    }

    /// Tables plus a saved 3-dim index under a temp data dir, keyed by `key_env`.
    fn data_dir_fixture(key_env: &str) -> (tempfile::TempDir, Settings) {
        std::env::set_var(key_env, "test-key");
        let dir = tempfile::tempdir().unwrap();

        let mut settings = Settings::default();
        settings.general.data_dir = dir.path().to_string_lossy().to_string();
        settings.provider.api_key_env = key_env.to_string();
        settings.embedding.dimensions = 3;

        std::fs::write(settings.summary_path(), r#"{"a": "flu", "b": "covid"}"#).unwrap();
        std::fs::write(
            settings.fulltext_path(),
            r#"{"a": "flu symptoms", "b": "covid symptoms"}"#,
        )
        .unwrap();

        let mut index = FlatVectorStore::new(3, DistanceMetric::Cosine);
        index.push("a", &[1.0, 0.0, 0.0]).unwrap();
        index.push("b", &[0.0, 1.0, 0.0]).unwrap();
        index
            .save(&settings.index_path(), &settings.index_ids_path())
            .unwrap();

        (dir, settings)
    }

    #[test]
    fn test_new_loads_data_dir() {
        let (_dir, settings) = data_dir_fixture("MEDRAG_ORCHESTRATOR_TEST_LOAD_KEY");

        let orchestrator = Orchestrator::new(settings).unwrap();
        let engine = orchestrator.engine();
        assert_eq!(engine.vector_store().ids(), &["a", "b"]);
        assert_eq!(engine.vector_store().dimensions(), 3);
        assert_eq!(engine.corpus().len(), 2);
        assert_eq!(engine.default_k(), 3);
        assert_eq!(orchestrator.settings().embedding.dimensions, 3);
    }

    #[test]
    fn test_dimension_mismatch_refuses_start() {
        let (_dir, mut settings) = data_dir_fixture("MEDRAG_ORCHESTRATOR_TEST_DIMS_KEY");
        settings.embedding.dimensions = 768;

        let err = Orchestrator::new(settings).err().unwrap();
        assert!(matches!(err, MedragError::Config(_)), "got {:?}", err);
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn test_missing_fulltext_table_refuses_start() {
        let (_dir, settings) = data_dir_fixture("MEDRAG_ORCHESTRATOR_TEST_TABLE_KEY");
        std::fs::remove_file(settings.fulltext_path()).unwrap();

        let err = Orchestrator::new(settings).err().unwrap();
        assert!(matches!(err, MedragError::Corpus(_)), "got {:?}", err);
    }

    #[test]
    fn test_truncated_index_refuses_start() {
        let (_dir, settings) = data_dir_fixture("MEDRAG_ORCHESTRATOR_TEST_INDEX_KEY");
        let bytes = std::fs::read(settings.index_path()).unwrap();
        std::fs::write(settings.index_path(), &bytes[..bytes.len() - 6]).unwrap();

        let err = Orchestrator::new(settings).err().unwrap();
        assert!(matches!(err, MedragError::Index(_)), "got {:?}", err);
    }

    #[test]
    fn test_index_source_parse() {
        assert_eq!("full-text".parse::<IndexSource>().unwrap(), IndexSource::FullText);
        assert_eq!("Summary".parse::<IndexSource>().unwrap(), IndexSource::Summary);
        assert!("both".parse::<IndexSource>().is_err());
    }
}

//! RAG response generation.

use super::{ContextBuilder, RetrievedDocument};
use crate::config::{Prompts, RagSettings};
use crate::corpus::Corpus;
use crate::embedding::Embedder;
use crate::error::{MedragError, Result};
use crate::generation::Generator;
use crate::vector_store::VectorStore;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answer returned when the index yields no documents at all.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant medical documents for this question.";

/// RAG engine for question answering.
///
/// Holds only shared, read-only collaborators, so a single engine serves
/// every request concurrently.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    corpus: Arc<Corpus>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    context_builder: ContextBuilder,
    default_k: usize,
    k_range: RangeInclusive<usize>,
}

impl RagEngine {
    /// Create a new RAG engine with default retrieval settings.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        corpus: Arc<Corpus>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            corpus,
            generator,
            prompts: Prompts::default(),
            context_builder: ContextBuilder::new(),
            default_k: 3,
            k_range: 1..=20,
        }
        .with_settings(&RagSettings::default())
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Apply top-k bounds and context options.
    pub fn with_settings(mut self, settings: &RagSettings) -> Self {
        self.default_k = settings.default_k;
        self.k_range = settings.min_k..=settings.max_k;
        self.context_builder = ContextBuilder::new()
            .with_dedup(settings.dedup)
            .with_max_chars(settings.max_context_chars);
        self
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub fn k_range(&self) -> RangeInclusive<usize> {
        self.k_range.clone()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Check a query and resolve its top-k.
    pub fn validate(&self, query: &str, k: Option<usize>) -> Result<usize> {
        if query.trim().is_empty() {
            return Err(MedragError::InvalidInput("query must not be empty".to_string()));
        }
        let k = k.unwrap_or(self.default_k);
        if !self.k_range.contains(&k) {
            return Err(MedragError::InvalidInput(format!(
                "k must be between {} and {}, got {}",
                self.k_range.start(),
                self.k_range.end(),
                k
            )));
        }
        Ok(k)
    }

    /// Retrieve up to `k` documents, most similar first.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<RetrievedDocument>> {
        let k = self.validate(query, k)?;

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.vector_store.search(&query_embedding, k).await?;

        let documents: Vec<RetrievedDocument> = hits
            .iter()
            .map(|hit| {
                let item = self.corpus.lookup(&hit.doc_id);
                let has_full_text = self.corpus.full_text(&hit.doc_id).is_some();
                RetrievedDocument::new(hit, item, has_full_text)
            })
            .collect();

        debug!("Retrieved {} documents for k={}", documents.len(), k);
        Ok(documents)
    }

    /// Render the prompt sent to the model for a query and its documents.
    pub fn build_prompt(&self, query: &str, documents: &[RetrievedDocument]) -> String {
        let context = self.context_builder.build(documents);
        self.prompts.render_rag(query, &context)
    }

    /// Answer a question from retrieved context.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn ask(&self, query: &str, k: Option<usize>) -> Result<RagResponse> {
        info!("Processing query: {}", query);

        let sources = self.retrieve(query, k).await?;

        if sources.is_empty() {
            return Ok(RagResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources,
            });
        }

        let prompt = self.build_prompt(query, &sources);
        let system = Some(self.prompts.rag.system.as_str()).filter(|s| !s.is_empty());

        let answer = self.generator.generate(system, &prompt).await?;

        debug!(
            "Generated response with {} sources using {}",
            sources.len(),
            self.generator.model()
        );

        Ok(RagResponse { answer, sources })
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Documents used for the answer, most similar first.
    pub sources: Vec<RetrievedDocument>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (score: {:.2})\n  {}",
                    source.item.id, source.score, source.item.summary
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::embedding::FakeEmbedder;
    use crate::generation::FakeGenerator;
    use crate::vector_store::FlatVectorStore;
    use std::collections::HashMap;

    fn corpus() -> Arc<Corpus> {
        let summaries = HashMap::from([
            ("d1".to_string(), "Influenza".to_string()),
            ("d2".to_string(), "COVID-19".to_string()),
            ("d3".to_string(), "Misc".to_string()),
        ]);
        let fulltexts = HashMap::from([
            ("d1".to_string(), "flu symptoms...".to_string()),
            ("d2".to_string(), "covid symptoms...".to_string()),
            ("d3".to_string(), "unrelated text".to_string()),
        ]);
        Arc::new(Corpus::new(summaries, fulltexts, "N/A"))
    }

    fn index() -> Arc<FlatVectorStore> {
        let mut index = FlatVectorStore::new(3, DistanceMetric::Cosine);
        index.push("d1", &[1.0, 0.2, 0.0]).unwrap();
        index.push("d2", &[0.9, 0.4, 0.0]).unwrap();
        index.push("d3", &[0.0, 0.0, 1.0]).unwrap();
        index.push("ghost", &[0.0, 1.0, 0.0]).unwrap();
        Arc::new(index)
    }

    fn embedder() -> Arc<FakeEmbedder> {
        Arc::new(
            FakeEmbedder::new(3)
                .with("fever and cough", vec![1.0, 0.25, 0.0])
                .with("strange", vec![0.0, 1.0, 0.0]),
        )
    }

    fn engine(generator: Arc<FakeGenerator>) -> RagEngine {
        RagEngine::new(embedder(), index(), corpus(), generator)
    }

    #[tokio::test]
    async fn test_fever_and_cough_scenario() {
        let generator = Arc::new(FakeGenerator::answering("Possible disease: flu\nCure: rest"));
        let engine = engine(generator.clone());

        let response = engine.ask("fever and cough", Some(2)).await.unwrap();

        let ids: Vec<_> = response.sources.iter().map(|s| s.item.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert_eq!(response.answer, "Possible disease: flu\nCure: rest");

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User query: fever and cough"));
        assert!(prompts[0].contains("flu symptoms...\n\ncovid symptoms..."));
        assert!(!prompts[0].contains("unrelated text"));
    }

    #[tokio::test]
    async fn test_result_count_bounded_by_k() {
        let engine = engine(Arc::new(FakeGenerator::answering("ok")));
        for k in 1..=6 {
            let docs = engine.retrieve("fever and cough", Some(k)).await.unwrap();
            assert!(docs.len() <= k);
        }
    }

    #[tokio::test]
    async fn test_unknown_ids_use_placeholder() {
        let engine = engine(Arc::new(FakeGenerator::answering("ok")));
        let docs = engine.retrieve("strange", Some(1)).await.unwrap();

        assert_eq!(docs[0].item.id, "ghost");
        assert_eq!(docs[0].item.summary, "N/A");
        assert_eq!(docs[0].item.full_text, "N/A");
        assert!(!docs[0].has_full_text);
    }

    #[tokio::test]
    async fn test_known_ids_match_tables() {
        let engine = engine(Arc::new(FakeGenerator::answering("ok")));
        let docs = engine.retrieve("fever and cough", Some(3)).await.unwrap();
        for doc in docs {
            assert_eq!(Some(doc.item.summary.as_str()), engine.corpus().summary(&doc.item.id));
            assert_eq!(Some(doc.item.full_text.as_str()), engine.corpus().full_text(&doc.item.id));
        }
    }

    #[tokio::test]
    async fn test_validation() {
        let engine = engine(Arc::new(FakeGenerator::answering("ok")));

        assert!(matches!(engine.validate("  ", None), Err(MedragError::InvalidInput(_))));
        assert!(matches!(engine.validate("q", Some(0)), Err(MedragError::InvalidInput(_))));
        assert!(matches!(engine.validate("q", Some(21)), Err(MedragError::InvalidInput(_))));
        assert_eq!(engine.validate("q", None).unwrap(), 3);

        let mut settings = RagSettings::default();
        settings.max_k = 5;
        let engine = engine.with_settings(&settings);
        assert!(engine.validate("q", Some(6)).is_err());
        assert_eq!(engine.k_range(), 1..=5);
    }

    #[tokio::test]
    async fn test_step_errors_are_typed() {
        let failing_embedder = Arc::new(FakeEmbedder::new(3).failing());
        let engine = RagEngine::new(
            failing_embedder,
            index(),
            corpus(),
            Arc::new(FakeGenerator::answering("ok")),
        );
        assert!(matches!(
            engine.ask("fever and cough", None).await,
            Err(MedragError::Embedding(_))
        ));

        let wrong_dims = Arc::new(FakeEmbedder::new(2).with("fever and cough", vec![1.0, 0.0]));
        let engine = RagEngine::new(
            wrong_dims,
            index(),
            corpus(),
            Arc::new(FakeGenerator::answering("ok")),
        );
        assert!(matches!(
            engine.ask("fever and cough", None).await,
            Err(MedragError::Index(_))
        ));

        let engine = engine_with(FakeGenerator::failing());
        assert!(matches!(
            engine.ask("fever and cough", None).await,
            Err(MedragError::Generation(_))
        ));
    }

    fn engine_with(generator: FakeGenerator) -> RagEngine {
        engine(Arc::new(generator))
    }

    #[tokio::test]
    async fn test_empty_index_skips_generation() {
        let generator = Arc::new(FakeGenerator::answering("should not be used"));
        let engine = RagEngine::new(
            embedder(),
            Arc::new(FlatVectorStore::new(3, DistanceMetric::Cosine)),
            corpus(),
            generator.clone(),
        );

        let response = engine.ask("fever and cough", None).await.unwrap();
        assert!(response.sources.is_empty());
        assert_eq!(response.answer, NO_CONTEXT_ANSWER);
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_custom_prompt_template() {
        let generator = Arc::new(FakeGenerator::answering("ok"));
        let mut prompts = Prompts::default();
        prompts.rag.user = "Q={{query}}|C={{context}}".to_string();
        let engine = engine(generator.clone()).with_prompts(prompts);

        engine.ask("fever and cough", Some(1)).await.unwrap();
        assert_eq!(generator.prompts()[0], "Q=fever and cough|C=flu symptoms...");
    }

    #[test]
    fn test_format_for_display() {
        let response = RagResponse {
            answer: "Rest.".to_string(),
            sources: Vec::new(),
        };
        assert_eq!(response.format_for_display(), "Rest.");
    }
}

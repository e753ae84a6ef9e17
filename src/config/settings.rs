//! Configuration settings for medrag.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub provider: ProviderSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub corpus: CorpusSettings,
    pub rag: RagSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory that relative data paths are resolved against.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: ".".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Hosted model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Texts per embedding request when building the index.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-004".to_string(),
            dimensions: 768,
            batch_size: 100,
        }
    }
}

/// Similarity metric used by the flat index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity, higher is closer.
    #[default]
    Cosine,
    /// Euclidean distance, scored as its negation so higher is still closer.
    L2,
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::L2 => write!(f, "l2"),
        }
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Path to the binary flat index.
    pub path: String,
    /// Path to the JSON array mapping index rows to document ids.
    pub ids_path: String,
    /// Similarity metric.
    pub metric: DistanceMetric,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: "index.bin".to_string(),
            ids_path: "index_ids.json".to_string(),
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Lookup table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// JSON object mapping document id to summary.
    pub summary_path: String,
    /// JSON object mapping document id to full text.
    pub fulltext_path: String,
    /// Value reported for ids missing from a table.
    pub placeholder: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            summary_path: "id_to_summary.json".to_string(),
            fulltext_path: "id_to_fulltext.json".to_string(),
            placeholder: "N/A".to_string(),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of documents retrieved when a query does not say.
    pub default_k: usize,
    /// Smallest accepted k.
    pub min_k: usize,
    /// Largest accepted k.
    pub max_k: usize,
    /// Character budget for the context block (0 = unlimited).
    pub max_context_chars: usize,
    /// Include each document at most once in the context.
    pub dedup: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            temperature: 0.7,
            default_k: 3,
            min_k: 1,
            max_k: 20,
            max_context_chars: 0,
            dedup: true,
        }
    }
}

/// How request-time failures are reported over HTTP.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Always answer 200 with the error in the body.
    #[default]
    Inline,
    /// Same body, with a status code derived from the failing step.
    Status,
}

impl std::str::FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(ErrorMode::Inline),
            "status" => Ok(ErrorMode::Status),
            _ => Err(format!("Unknown error mode: {}", s)),
        }
    }
}

impl std::fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorMode::Inline => write!(f, "inline"),
            ErrorMode::Status => write!(f, "status"),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allow any origin, method and header.
    pub cors: bool,
    pub error_mode: ErrorMode,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors: true,
            error_mode: ErrorMode::Inline,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::MedragError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("medrag")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Resolve a configured path: `~` is expanded, relative paths land in the data directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let expanded = Self::expand_path(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }

    pub fn summary_path(&self) -> PathBuf {
        self.resolve(&self.corpus.summary_path)
    }

    pub fn fulltext_path(&self) -> PathBuf {
        self.resolve(&self.corpus.fulltext_path)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.index.path)
    }

    pub fn index_ids_path(&self) -> PathBuf {
        self.resolve(&self.index.ids_path)
    }

    /// Check settings that would otherwise fail at request time.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::MedragError;

        if self.rag.min_k == 0 {
            return Err(MedragError::Config("rag.min_k must be at least 1".to_string()));
        }
        if self.rag.min_k > self.rag.max_k {
            return Err(MedragError::Config(format!(
                "rag.min_k ({}) is greater than rag.max_k ({})",
                self.rag.min_k, self.rag.max_k
            )));
        }
        if !(self.rag.min_k..=self.rag.max_k).contains(&self.rag.default_k) {
            return Err(MedragError::Config(format!(
                "rag.default_k ({}) is outside {}..={}",
                self.rag.default_k, self.rag.min_k, self.rag.max_k
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(MedragError::Config("embedding.dimensions must be positive".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(MedragError::Config("embedding.batch_size must be positive".to_string()));
        }
        Ok(())
    }
}

//! Error types for medrag.

use thiserror::Error;

/// Library-level error type for medrag operations.
///
/// Request-time failures are split per pipeline step so the HTTP layer can
/// tell them apart.
#[derive(Error, Debug)]
pub enum MedragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timed out: {0}")]
    GenerationTimeout(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MedragError {
    /// Short machine-readable name of the failing step.
    pub fn kind(&self) -> &'static str {
        match self {
            MedragError::Config(_) => "config",
            MedragError::Embedding(_) => "embedding",
            MedragError::Index(_) => "index",
            MedragError::Generation(_) | MedragError::GenerationTimeout(_) => "generation",
            MedragError::Corpus(_) => "corpus",
            MedragError::InvalidInput(_) => "invalid_input",
            MedragError::Io(_) | MedragError::Json(_) | MedragError::TomlParse(_) => "io",
            MedragError::Http(_) => "http",
        }
    }
}

/// Result type alias for medrag operations.
pub type Result<T> = std::result::Result<T, MedragError>;

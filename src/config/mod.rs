//! Configuration module for medrag.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CorpusSettings, DistanceMetric, EmbeddingSettings, ErrorMode, GeneralSettings,
    IndexSettings, PromptSettings, ProviderSettings, RagSettings, ServerSettings, Settings,
};

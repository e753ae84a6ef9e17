//! Text generation through a hosted language model.

mod openai;

pub use openai::ChatGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for prompt completion.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete a user prompt, with an optional system message.
    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<String>;

    /// Model identifier used for completions.
    fn model(&self) -> &str;
}

#[cfg(test)]
pub use fake::FakeGenerator;

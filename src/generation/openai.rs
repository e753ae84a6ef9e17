//! Chat-completion generator for OpenAI-compatible providers.

use super::Generator;
use crate::error::{MedragError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Generator backed by the `/chat/completions` endpoint.
pub struct ChatGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl ChatGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_messages(
        system: Option<&str>,
        prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| MedragError::Generation(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| MedragError::Generation(e.to_string()))?
                .into(),
        );

        Ok(messages)
    }
}

fn map_api_error(err: OpenAIError) -> MedragError {
    match err {
        OpenAIError::Reqwest(e) if e.is_timeout() => MedragError::GenerationTimeout(e.to_string()),
        other => MedragError::Generation(format!("Failed to generate response: {}", other)),
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    #[instrument(skip(self, system, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::build_messages(system, prompt)?)
            .temperature(self.temperature)
            .build()
            .map_err(|e| MedragError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_api_error)?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| MedragError::Generation("Empty response from LLM".to_string()))?
            .clone();

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

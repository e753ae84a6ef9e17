//! OpenAI-compatible client configuration.
//!
//! Both the embedding and chat endpoints are reached through the
//! OpenAI wire format, so any compatible provider (Gemini's compatibility
//! endpoint by default) can be plugged in through `[provider]` settings.

use crate::config::ProviderSettings;
use crate::error::{MedragError, Result};
use async_openai::{config::OpenAIConfig, Client};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Read the provider API key from the configured environment variable.
pub fn api_key(provider: &ProviderSettings) -> Result<String> {
    match std::env::var(&provider.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(MedragError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            provider.api_key_env, provider.api_key_env
        ))),
        Err(_) => Err(MedragError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            provider.api_key_env, provider.api_key_env
        ))),
    }
}

/// Create a client for the configured provider.
///
/// The request timeout bounds every call, including generation.
pub fn create_client(provider: &ProviderSettings, api_key: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(
        &provider.api_base,
        api_key,
        Duration::from_secs(provider.timeout_seconds),
    )
}

/// Create a client against an explicit base URL with a custom timeout.
///
/// Failed calls are not retried, so `timeout` bounds the whole call.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry()))
}

/// A backoff that gives up after the first failure, rate limits included.
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Load a `.env` file into the process environment.
///
/// Variables that are already set win over the file. Returns the path that
/// was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|_| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

//! OpenAI-compatible client configuration for the local model server.

use crate::config::ModelSettings;
use crate::error::{Result, SvarError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use tracing::info;

/// Connect timeout for the model server (seconds).
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Create a client for the local OpenAI-compatible server.
///
/// The request timeout covers a full completion (or agent turn), so it is
/// taken from settings rather than hardcoded; local servers under load can
/// legitimately take minutes per request.
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_seconds))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .pool_max_idle_per_host(settings.max_concurrent)
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(settings.base_url.clone())
        .with_api_key(settings.api_key.clone());

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Resolve the model name to use against the server.
///
/// When the settings name a model, that wins. Otherwise the first model the
/// server advertises is used, which is how single-model local servers
/// (vLLM and friends) expect to be addressed.
pub async fn resolve_model(
    client: &Client<OpenAIConfig>,
    settings: &ModelSettings,
) -> Result<String> {
    if let Some(name) = &settings.model {
        if !name.is_empty() {
            return Ok(name.clone());
        }
    }

    let models = client
        .models()
        .list()
        .await
        .map_err(|e| SvarError::ModelApi(format!("Failed to list models: {}", e)))?;

    let model = models
        .data
        .first()
        .map(|m| m.id.clone())
        .ok_or_else(|| SvarError::ModelApi("No models available on server".to_string()))?;

    info!("Using model: {}", model);
    Ok(model)
}

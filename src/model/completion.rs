//! Direct completion against the local server's legacy completions endpoint.

use super::{InvocationGate, ModelInvoker, ModelResponse};
use crate::config::Settings;
use crate::error::{Result, SvarError};
use crate::openai::{create_client, resolve_model};
use crate::prompt::PromptMode;
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateCompletionRequestArgs;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Model invoker backed by the raw completions endpoint.
///
/// Prompts are expected to already carry the chat template (direct mode),
/// matching how vLLM-style servers serve chat models over `/completions`.
pub struct CompletionInvoker {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    gate: InvocationGate,
}

impl CompletionInvoker {
    /// Connect to the configured server and resolve the model to use.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let client = create_client(&settings.model)?;
        let model = resolve_model(&client, &settings.model).await?;

        let mut temperature = settings.model.temperature;
        if temperature == 0.0 {
            // Greedy decoding degrades Qwen-family output badly.
            warn!("Temperature 0 (greedy decoding) not recommended; using 0.3 instead");
            temperature = 0.3;
        }

        Ok(Self {
            client,
            model,
            max_tokens: settings.model.max_tokens,
            temperature,
            gate: InvocationGate::new(
                settings.model.max_concurrent,
                Duration::from_secs(settings.model.request_timeout_seconds),
            ),
        })
    }

    /// The resolved model name.
    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelInvoker for CompletionInvoker {
    fn mode(&self) -> PromptMode {
        PromptMode::Direct
    }

    async fn invoke(&self, prompt: &str) -> Result<ModelResponse> {
        let request = CreateCompletionRequestArgs::default()
            .model(&self.model)
            .prompt(prompt)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .top_p(0.95)
            .presence_penalty(1.0)
            .build()
            .map_err(|e| SvarError::ModelApi(format!("Failed to build request: {}", e)))?;

        self.gate
            .admit(async {
                debug!("Dispatching completion request");
                let response = self
                    .client
                    .completions()
                    .create(request)
                    .await
                    .map_err(|e| SvarError::ModelApi(format!("Completion failed: {}", e)))?;

                let text = response
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.text)
                    .ok_or_else(|| SvarError::ModelApi("Empty completion response".to_string()))?;

                Ok(ModelResponse::Completion { text })
            })
            .await
    }
}

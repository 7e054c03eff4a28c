//! Agent-backed model invocation.

use super::{InvocationGate, ModelInvoker, ModelResponse};
use crate::agent::{Agent, ToolContext};
use crate::config::Settings;
use crate::error::Result;
use crate::openai::{create_client, resolve_model};
use crate::prompt::PromptMode;
use async_trait::async_trait;
use std::time::Duration;

/// Model invoker that routes every prompt through the tool-using agent.
///
/// The timeout covers the whole agent run for one question, tool calls
/// included, mirroring the per-question budget of the direct path.
pub struct AgentInvoker {
    agent: Agent,
    gate: InvocationGate,
}

impl AgentInvoker {
    /// Connect to the configured server and assemble the agent with its
    /// enabled tools.
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let client = create_client(&settings.model)?;
        let model = resolve_model(&client, &settings.model).await?;
        let tools = ToolContext::from_settings(settings)?;

        let agent = Agent::new(client, &model, tools)
            .with_max_iterations(settings.agent.max_iterations);

        Ok(Self {
            agent,
            gate: InvocationGate::new(
                settings.model.max_concurrent,
                Duration::from_secs(settings.model.request_timeout_seconds),
            ),
        })
    }
}

#[async_trait]
impl ModelInvoker for AgentInvoker {
    fn mode(&self) -> PromptMode {
        PromptMode::Agent
    }

    async fn invoke(&self, prompt: &str) -> Result<ModelResponse> {
        self.gate
            .admit(async { self.agent.run(prompt).await.map(ModelResponse::Agent) })
            .await
    }
}

//! Model-invocation capability.
//!
//! The orchestrator treats the model as an opaque capability: a prompt
//! string goes in, a [`ModelResponse`] or a failure comes out. The two
//! implementations share the run-wide admission gate that protects the
//! local server from overload.

mod agent;
mod completion;

pub use agent::AgentInvoker;
pub use completion::CompletionInvoker;

use crate::agent::AgentResponse;
use crate::error::{Result, SvarError};
use crate::prompt::PromptMode;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Outcome of a model invocation.
#[derive(Debug)]
pub enum ModelResponse {
    /// Plain completion text from the direct endpoint.
    Completion { text: String },
    /// Structured outcome of an agent run.
    Agent(AgentResponse),
}

impl ModelResponse {
    /// The text to hand to answer extraction.
    ///
    /// An agent outcome exposes a final response and that is what counts;
    /// a plain completion is its own final response.
    pub fn final_text(&self) -> &str {
        match self {
            ModelResponse::Completion { text } => text,
            ModelResponse::Agent(response) => &response.content,
        }
    }
}

/// A capability that turns a prompt into a model response.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Which prompt format this invoker consumes.
    fn mode(&self) -> PromptMode;

    /// Invoke the model once. May fail with a timeout or API error;
    /// failures are per-invocation and never poison the invoker.
    async fn invoke(&self, prompt: &str) -> Result<ModelResponse>;
}

/// Run-wide admission gate: bounds in-flight invocations and applies the
/// per-invocation timeout. Waiting for a permit does not count against the
/// timeout; only the model call itself does.
pub(crate) struct InvocationGate {
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl InvocationGate {
    pub fn new(max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub async fn admit<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SvarError::ModelApi("Admission gate closed".to_string()))?;

        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| SvarError::InvocationTimeout(self.timeout.as_secs()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_text_prefers_agent_content() {
        let response = ModelResponse::Agent(AgentResponse {
            content: "final".to_string(),
            tool_calls: Vec::new(),
            iterations: 2,
        });
        assert_eq!(response.final_text(), "final");

        let response = ModelResponse::Completion {
            text: "raw".to_string(),
        };
        assert_eq!(response.final_text(), "raw");
    }

    #[tokio::test]
    async fn test_gate_maps_elapsed_timer_to_timeout_error() {
        let gate = InvocationGate::new(2, Duration::from_millis(20));

        let result: Result<()> = gate
            .admit(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(SvarError::InvocationTimeout(_))));
    }

    #[tokio::test]
    async fn test_gate_bounds_concurrency() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let gate = Arc::new(InvocationGate::new(2, Duration::from_secs(5)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    gate.admit(async {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}

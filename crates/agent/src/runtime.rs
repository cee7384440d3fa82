use std::sync::Arc;

use fxdesk_core::PipelineError;
use thiserror::Error;
use tracing::warn;

use crate::dispatcher::{DispatchError, DispatchOutcome, IntentDispatcher};
use crate::llm::{LlmClient, LlmError};
use crate::tools::{ToolError, ToolRegistry};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<AgentError> for PipelineError {
    fn from(value: AgentError) -> Self {
        match value {
            AgentError::Llm(error) => Self::UpstreamModel(error.to_string()),
            AgentError::Dispatch(DispatchError::Tool(ToolError::ExternalService { .. })) => {
                Self::ExternalService
            }
            AgentError::Dispatch(error) => Self::DispatchMismatch(error.to_string()),
        }
    }
}

/// Message → model → dispatcher pipeline. Holds only immutable, shareable state.
#[derive(Clone)]
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    dispatcher: IntentDispatcher,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        let dispatcher = IntentDispatcher::new(registry.clone());
        Self { llm, registry, dispatcher }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn handle_message(
        &self,
        message: &str,
        correlation_id: &str,
    ) -> Result<DispatchOutcome, AgentError> {
        let response =
            self.llm.generate(message, self.registry.descriptors()).await.map_err(|error| {
                warn!(
                    event_name = "agent.llm.failed",
                    correlation_id,
                    error = %error,
                    "llm call failed"
                );
                error
            })?;

        Ok(self.dispatcher.dispatch(response, correlation_id).await?)
    }
}

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::llm::ModelResponse;
use crate::tools::{ToolArguments, ToolError, ToolOutput, ToolRegistry};

#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    Completed { tool: String, output: ToolOutput },
    /// The model answered in prose; the text is kept for logs.
    NoActionableIntent { raw_text: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("model requested unregistered tool `{0}`")]
    UnknownTool(String),
    #[error("invalid argument `{argument}` for tool `{tool}`: {reason}")]
    InvalidArgument { tool: String, argument: String, reason: String },
    #[error(transparent)]
    Tool(ToolError),
}

/// Routes the first function call of a model response to its registered tool.
#[derive(Clone)]
pub struct IntentDispatcher {
    registry: Arc<ToolRegistry>,
}

impl IntentDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub async fn dispatch(
        &self,
        response: ModelResponse,
        correlation_id: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut calls = match response {
            ModelResponse::FunctionCalls(calls) => calls.into_iter(),
            ModelResponse::PlainText(text) => return Ok(no_intent(text, correlation_id)),
        };
        let Some(call) = calls.next() else {
            return Ok(no_intent(String::new(), correlation_id));
        };
        let ignored = calls.len();

        info!(
            event_name = "agent.dispatch.function_call",
            correlation_id,
            tool = %call.name,
            arguments = %serde_json::Value::Object(call.args.clone()),
            "function call selected"
        );
        if ignored > 0 {
            debug!(
                event_name = "agent.dispatch.extra_calls_ignored",
                correlation_id,
                ignored,
                "only the first function call is dispatched"
            );
        }

        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| DispatchError::UnknownTool(call.name.clone()))?;

        tool.descriptor().parameters.validate(&call.args).map_err(|error| {
            DispatchError::InvalidArgument {
                tool: call.name.clone(),
                argument: error.argument,
                reason: error.reason,
            }
        })?;

        let output =
            tool.execute(ToolArguments::new(call.args)).await.map_err(|error| match error {
                ToolError::InvalidArgument { argument, reason } => {
                    DispatchError::InvalidArgument { tool: call.name.clone(), argument, reason }
                }
                other => DispatchError::Tool(other),
            })?;

        Ok(DispatchOutcome::Completed { tool: call.name, output })
    }
}

fn no_intent(raw_text: String, correlation_id: &str) -> DispatchOutcome {
    info!(
        event_name = "agent.dispatch.no_function_call",
        correlation_id,
        raw_text = %raw_text,
        "no function call found in the model response"
    );
    DispatchOutcome::NoActionableIntent { raw_text }
}

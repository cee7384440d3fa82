use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tools::ToolDescriptor;

/// A structured request from the model to invoke a named tool.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelResponse {
    /// Function calls in the order the provider returned them.
    FunctionCalls(Vec<FunctionCall>),
    PlainText(String),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("llm provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode llm response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one user message with the given tool declarations attached.
    async fn generate(
        &self,
        message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError>;
}

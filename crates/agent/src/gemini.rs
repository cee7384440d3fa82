//! Gemini `generateContent` client with function declarations attached.

use std::time::Duration;

use async_trait::async_trait;
use fxdesk_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::llm::{FunctionCall, LlmClient, LlmError, ModelResponse};
use crate::tools::{ParameterType, ToolDescriptor};

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::Transport)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        message: &str,
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError> {
        let body = request_body(message, tools);
        debug!(event_name = "agent.llm.request", model = %self.model, tools = tools.len(), "calling gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Transport)?;

        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), message: error_message(&text) });
        }

        let payload: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|error| LlmError::Decode(error.to_string()))?;
        Ok(payload.into_model_response())
    }
}

fn request_body(message: &str, tools: &[ToolDescriptor]) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": message }] }],
    });

    if !tools.is_empty() {
        let declarations = tools.iter().map(function_declaration).collect::<Vec<_>>();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

fn function_declaration(tool: &ToolDescriptor) -> Value {
    let properties = tool
        .parameters
        .properties
        .iter()
        .map(|(name, spec)| {
            (
                name.clone(),
                json!({ "type": schema_type(spec.kind), "description": spec.description }),
            )
        })
        .collect::<Map<String, Value>>();

    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": {
            "type": "OBJECT",
            "properties": properties,
            "required": tool.parameters.required,
        },
    })
}

fn schema_type(kind: ParameterType) -> &'static str {
    match kind {
        ParameterType::String => "STRING",
        ParameterType::Number => "NUMBER",
        ParameterType::Integer => "INTEGER",
        ParameterType::Boolean => "BOOLEAN",
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    function_call: Option<WireFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    args: Option<Map<String, Value>>,
}

impl GenerateContentResponse {
    /// Only the first candidate is read.
    fn into_model_response(self) -> ModelResponse {
        let parts = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        let mut calls = Vec::new();
        let mut text = String::new();
        for part in parts {
            let thought = part.thought;
            match (part.function_call, part.text) {
                (Some(call), _) => calls
                    .push(FunctionCall { name: call.name, args: call.args.unwrap_or_default() }),
                (None, Some(fragment)) if !thought => text.push_str(&fragment),
                _ => {}
            }
        }

        if calls.is_empty() {
            ModelResponse::PlainText(text)
        } else {
            ModelResponse::FunctionCalls(calls)
        }
    }
}

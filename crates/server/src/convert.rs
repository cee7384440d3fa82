//! `POST /convert`: free-text message in, rupee-to-dollar conversion out.
//!
//! Status mapping:
//! - function call dispatched and conversion computed -> `200` with the converted amounts
//! - model answered without a function call -> `200` with `success: false`
//! - any failure along the way -> `500` with `success: false` and an error message

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use fxdesk_agent::{AgentRuntime, DispatchOutcome, ToolOutput};
use fxdesk_core::domain::conversion::serialize_js_number;
use fxdesk_core::PipelineError;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const NO_INTENT_MESSAGE: &str = "Could not process conversion request";

#[derive(Clone)]
pub struct ConvertState {
    runtime: AgentRuntime,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConvertResponse {
    Converted {
        success: bool,
        #[serde(serialize_with = "serialize_js_number")]
        inr: f64,
        usd: String,
        message: String,
    },
    Failed {
        success: bool,
        message: String,
    },
}

impl ConvertResponse {
    fn failed(message: impl Into<String>) -> Self {
        Self::Failed { success: false, message: message.into() }
    }
}

pub fn router(runtime: AgentRuntime) -> Router {
    Router::new().route("/convert", post(convert)).with_state(ConvertState { runtime })
}

pub async fn convert(
    State(state): State<ConvertState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> (StatusCode, Json<ConvertResponse>) {
    let correlation_id = Uuid::new_v4().to_string();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                event_name = "server.convert.bad_body",
                correlation_id = %correlation_id,
                error = %rejection.body_text(),
                "request body could not be decoded"
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ConvertResponse::failed(rejection.body_text())),
            );
        }
    };

    info!(
        event_name = "server.convert.received",
        correlation_id = %correlation_id,
        message = %request.message,
        "conversion request received"
    );

    match state.runtime.handle_message(&request.message, &correlation_id).await {
        Ok(DispatchOutcome::Completed { output: ToolOutput::Conversion(result), .. }) => {
            let response = ConvertResponse::Converted {
                success: true,
                inr: result.inr_amount,
                usd: result.usd_display(),
                message: result.summary(),
            };
            info!(
                event_name = "server.convert.completed",
                correlation_id = %correlation_id,
                inr = result.inr_amount,
                usd = result.usd_amount,
                "conversion completed"
            );
            (StatusCode::OK, Json(response))
        }
        Ok(DispatchOutcome::NoActionableIntent { .. }) => {
            (StatusCode::OK, Json(ConvertResponse::failed(NO_INTENT_MESSAGE)))
        }
        Err(agent_error) => {
            let pipeline_error = PipelineError::from(agent_error);
            error!(
                event_name = "server.convert.failed",
                correlation_id = %correlation_id,
                error_kind = pipeline_error.kind(),
                error = %pipeline_error,
                "conversion request failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ConvertResponse::failed(pipeline_error.user_message())),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::extract::State;
    use axum::http::{header, Request, StatusCode};
    use axum::Json;
    use fxdesk_agent::currency::{RateError, RateProvider, RateTable};
    use fxdesk_agent::{
        conversion_registry, AgentRuntime, FunctionCall, LlmClient, LlmError, ModelResponse,
        ToolDescriptor,
    };
    use serde_json::{json, Map, Value};
    use tower::ServiceExt;

    use super::{convert, router, ConvertRequest, ConvertResponse, ConvertState, NO_INTENT_MESSAGE};

    enum Script {
        Respond(ModelResponse),
        Fail,
    }

    struct ScriptedLlm {
        script: Script,
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(
            &self,
            message: &str,
            _tools: &[ToolDescriptor],
        ) -> Result<ModelResponse, LlmError> {
            if let Ok(mut messages) = self.messages.lock() {
                messages.push(message.to_string());
            }
            match &self.script {
                Script::Respond(response) => Ok(response.clone()),
                Script::Fail => Err(LlmError::Status {
                    status: 403,
                    message: "API key not valid".to_string(),
                }),
            }
        }
    }

    struct StaticRates(Vec<(&'static str, f64)>);

    #[async_trait]
    impl RateProvider for StaticRates {
        async fn latest_rates(&self, base: &str) -> Result<RateTable, RateError> {
            Ok(RateTable {
                base: base.to_string(),
                rates: self.0.iter().map(|(code, rate)| (code.to_string(), *rate)).collect(),
            })
        }
    }

    fn call(name: &str, args: Value) -> ModelResponse {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ModelResponse::FunctionCalls(vec![FunctionCall { name: name.to_string(), args }])
    }

    fn runtime(script: Script, rates: Vec<(&'static str, f64)>) -> (AgentRuntime, Arc<ScriptedLlm>) {
        let llm = Arc::new(ScriptedLlm { script, messages: Mutex::new(Vec::new()) });
        let registry = conversion_registry(Arc::new(StaticRates(rates))).expect("registry");
        (AgentRuntime::new(llm.clone(), Arc::new(registry)), llm)
    }

    async fn invoke(runtime: AgentRuntime, message: &str) -> (StatusCode, ConvertResponse) {
        let request = ConvertRequest { message: message.to_string() };
        let (status, Json(body)) = convert(State(ConvertState { runtime }), Ok(Json(request))).await;
        (status, body)
    }

    async fn post_raw(runtime: AgentRuntime, body: &str) -> (StatusCode, Value) {
        let (status, bytes) = post_bytes(runtime, body).await;
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    async fn post_bytes(runtime: AgentRuntime, body: &str) -> (StatusCode, Vec<u8>) {
        let response = router(runtime)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn worked_example_produces_exact_body() {
        let (runtime, _) = runtime(
            Script::Respond(call("convertINRtoUSD", json!({ "amount": 100 }))),
            vec![("INR", 1.0), ("USD", 0.012)],
        );

        let response = router(runtime)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"Convert 100 INR to USD"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(
            std::str::from_utf8(&bytes).expect("utf8"),
            r#"{"success":true,"inr":100,"usd":"1.20","message":"100 INR = 1.20 USD"}"#
        );
    }

    #[tokio::test]
    async fn usd_is_amount_times_rate_rounded_to_cents() {
        let (runtime, _) = runtime(
            Script::Respond(call("convertINRtoUSD", json!({ "amount": 2500.75 }))),
            vec![("USD", 0.011987)],
        );

        let (status, body) = invoke(runtime, "how much is 2500.75 rupees in dollars").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            ConvertResponse::Converted {
                success: true,
                inr: 2500.75,
                usd: "29.98".to_string(),
                message: "2500.75 INR = 29.98 USD".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn missing_usd_rate_returns_fixed_failure_message() {
        let (runtime, _) = runtime(
            Script::Respond(call("convertINRtoUSD", json!({ "amount": 100 }))),
            vec![("EUR", 0.011)],
        );

        let (status, body) = invoke(runtime, "convert 100").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, ConvertResponse::failed("Failed to convert currency"));
    }

    #[tokio::test]
    async fn prose_answer_is_a_soft_failure() {
        let (runtime, _) = runtime(
            Script::Respond(ModelResponse::PlainText("Hello! How can I help?".to_string())),
            vec![("USD", 0.012)],
        );

        let (status, body) = post_raw(runtime, r#"{"message":"hello"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": false, "message": NO_INTENT_MESSAGE }));
    }

    #[tokio::test]
    async fn unregistered_tool_is_a_server_error() {
        let (runtime, _) = runtime(
            Script::Respond(call("convertUSDtoINR", json!({ "amount": 5 }))),
            vec![("USD", 0.012)],
        );

        let (status, body) = invoke(runtime, "convert 5 dollars to rupees").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        match body {
            ConvertResponse::Failed { success, message } => {
                assert!(!success);
                assert!(message.contains("convertUSDtoINR"));
            }
            other => panic!("expected failure body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn model_failure_is_a_server_error() {
        let (runtime, _) = runtime(Script::Fail, vec![("USD", 0.012)]);

        let (status, body) = post_raw(runtime, r#"{"message":"convert 1"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].as_str().unwrap_or_default().contains("API key not valid"));
    }

    #[tokio::test]
    async fn repeated_requests_yield_identical_bodies() {
        let (runtime, _) = runtime(
            Script::Respond(call("convertINRtoUSD", json!({ "amount": 42.5 }))),
            vec![("USD", 0.012)],
        );

        let body = r#"{"message":"convert 42.5"}"#;
        let first = post_bytes(runtime.clone(), body).await;
        let second = post_bytes(runtime, body).await;

        assert_eq!(first.0, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(
            std::str::from_utf8(&first.1).expect("utf8"),
            r#"{"success":true,"inr":42.5,"usd":"0.51","message":"42.5 INR = 0.51 USD"}"#
        );
    }

    #[tokio::test]
    async fn missing_message_is_forwarded_as_empty_text() {
        let (runtime, llm) =
            runtime(Script::Respond(ModelResponse::PlainText(String::new())), vec![("USD", 0.012)]);

        let (status, body) = post_raw(runtime, "{}").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!(NO_INTENT_MESSAGE));
        let seen = llm.messages.lock().map(|messages| messages.clone()).unwrap_or_default();
        assert_eq!(seen, vec![String::new()]);
    }

    #[tokio::test]
    async fn malformed_json_uses_error_shape() {
        let (runtime, llm) =
            runtime(Script::Respond(ModelResponse::PlainText(String::new())), vec![("USD", 0.012)]);

        let (status, body) = post_raw(runtime, "{not json").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert!(body["message"].is_string());
        let seen = llm.messages.lock().map(|messages| messages.len()).unwrap_or_default();
        assert_eq!(seen, 0);
    }
}

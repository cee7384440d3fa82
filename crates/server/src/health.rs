use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use fxdesk_agent::AgentRuntime;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    runtime: AgentRuntime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub tools: HealthCheck,
    pub checked_at: String,
}

pub fn router(runtime: AgentRuntime) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { runtime })
}

/// Local readiness only; neither upstream service is contacted.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let tools = tools_check(&state.runtime);
    let ready = tools.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "fxdesk-server runtime initialized".to_string(),
        },
        tools,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn tools_check(runtime: &AgentRuntime) -> HealthCheck {
    let registry = runtime.registry();
    if registry.is_empty() {
        return HealthCheck { status: "degraded", detail: "no tools registered".to_string() };
    }

    let names = registry.descriptors().iter().map(|tool| tool.name.as_str()).collect::<Vec<_>>();
    HealthCheck { status: "ready", detail: format!("tools registered: {}", names.join(", ")) }
}

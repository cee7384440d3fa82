use std::sync::Arc;

use axum::Router;
use fxdesk_agent::currency::RateError;
use fxdesk_agent::tools::RegistryError;
use fxdesk_agent::{
    conversion_registry, AgentRuntime, ExchangeRateApiClient, GeminiClient, LlmError,
};
use fxdesk_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::info;

use crate::{convert, health};

pub struct Application {
    pub config: AppConfig,
    pub runtime: AgentRuntime,
}

impl Application {
    pub fn router(&self) -> Router {
        convert::router(self.runtime.clone()).merge(health::router(self.runtime.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client construction failed: {0}")]
    LlmClient(#[source] LlmError),
    #[error("exchange-rate client construction failed: {0}")]
    RatesClient(#[source] RateError),
    #[error("tool registration failed: {0}")]
    Registry(#[from] RegistryError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let llm = GeminiClient::new(&config.llm).map_err(BootstrapError::LlmClient)?;
    let rates = ExchangeRateApiClient::new(&config.rates).map_err(BootstrapError::RatesClient)?;
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        model = %llm.model(),
        rates_base_url = %config.rates.base_url,
        "outbound clients constructed"
    );

    let registry = conversion_registry(Arc::new(rates))?;
    info!(
        event_name = "system.bootstrap.tools_registered",
        correlation_id = "bootstrap",
        tool_count = registry.len(),
        "tool registry frozen"
    );

    let runtime = AgentRuntime::new(Arc::new(llm), Arc::new(registry));
    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        "application bootstrap complete"
    );
    Ok(Application { config, runtime })
}

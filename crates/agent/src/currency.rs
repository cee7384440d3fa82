//! Rupee-to-dollar conversion tool backed by a live exchange-rate table.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fxdesk_core::config::RatesConfig;
use fxdesk_core::domain::conversion::{SOURCE_CURRENCY, TARGET_CURRENCY};
use fxdesk_core::{Amount, ConversionResult};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::tools::{
    ParameterSchema, ParameterType, RegistryError, Tool, ToolArguments, ToolDescriptor, ToolError,
    ToolOutput, ToolRegistry,
};

pub const CONVERT_INR_TO_USD: &str = "convertINRtoUSD";

/// Exchange rates relative to `base`, keyed by ISO currency code.
/// Non-numeric rates are dropped on decode.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RateTable {
    #[serde(default, alias = "base_code")]
    pub base: String,
    #[serde(default, deserialize_with = "numeric_rates")]
    pub rates: BTreeMap<String, f64>,
}

fn numeric_rates<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Map::<String, Value>::deserialize(deserializer)?;
    Ok(raw.into_iter().filter_map(|(code, rate)| rate.as_f64().map(|rate| (code, rate))).collect())
}

impl RateTable {
    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(currency).copied()
    }
}

#[derive(Debug, Error)]
pub enum RateError {
    #[error("exchange-rate request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("exchange-rate provider returned status {0}")]
    Status(u16),
    #[error("could not decode exchange-rate payload: {0}")]
    Decode(String),
    #[error("rate table for {base} has no usable {currency} entry")]
    MissingCurrency { base: String, currency: String },
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn latest_rates(&self, base: &str) -> Result<RateTable, RateError>;
}

/// Client for the `GET /v4/latest/{base}` endpoint of exchangerate-api.com.
pub struct ExchangeRateApiClient {
    client: Client,
    base_url: String,
}

impl ExchangeRateApiClient {
    pub fn new(config: &RatesConfig) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RateError::Transport)?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApiClient {
    async fn latest_rates(&self, base: &str) -> Result<RateTable, RateError> {
        let url = format!("{}/v4/latest/{}", self.base_url, base);
        let response = self.client.get(&url).send().await.map_err(RateError::Transport)?;

        if !response.status().is_success() {
            return Err(RateError::Status(response.status().as_u16()));
        }

        let body = response.text().await.map_err(RateError::Transport)?;
        serde_json::from_str::<RateTable>(&body).map_err(|error| RateError::Decode(error.to_string()))
    }
}

pub struct ConvertInrToUsd {
    descriptor: ToolDescriptor,
    rates: Arc<dyn RateProvider>,
}

impl ConvertInrToUsd {
    pub fn new(rates: Arc<dyn RateProvider>) -> Self {
        let descriptor = ToolDescriptor::new(
            CONVERT_INR_TO_USD,
            "Convert amount from Indian Rupees (INR) to US Dollars (USD)",
            ParameterSchema::new().required(
                "amount",
                ParameterType::Number,
                "Amount in INR to convert",
            ),
        );
        Self { descriptor, rates }
    }

    /// One rate fetch per call; the result is not rounded.
    pub async fn convert(&self, amount: Amount) -> Result<ConversionResult, RateError> {
        let table = self.rates.latest_rates(SOURCE_CURRENCY).await?;
        let usd_rate = table.rate(TARGET_CURRENCY).filter(|rate| rate.is_finite()).ok_or_else(|| {
            RateError::MissingCurrency {
                base: table.base.clone(),
                currency: TARGET_CURRENCY.to_string(),
            }
        })?;

        Ok(ConversionResult::compute(amount, usd_rate))
    }
}

#[async_trait]
impl Tool for ConvertInrToUsd {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<ToolOutput, ToolError> {
        let raw_amount = arguments.number("amount")?;
        let amount = Amount::new(raw_amount).map_err(|error| ToolError::InvalidArgument {
            argument: "amount".to_string(),
            reason: error.to_string(),
        })?;
        info!(event_name = "agent.tool.convert", amount = amount.value(), "converting INR to USD");

        let result = self.convert(amount).await.map_err(|error| {
            warn!(
                event_name = "agent.tool.convert_failed",
                error = %error,
                "exchange-rate lookup failed"
            );
            ToolError::ExternalService { service: "exchange_rate", cause: error.to_string() }
        })?;

        Ok(ToolOutput::Conversion(result))
    }
}

/// The registry offered on every model call: a single rupee-to-dollar tool.
pub fn conversion_registry(rates: Arc<dyn RateProvider>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::default();
    registry.register(ConvertInrToUsd::new(rates))?;
    Ok(registry)
}

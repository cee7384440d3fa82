use thiserror::Error;

/// Caller-facing text for any exchange-rate failure. The upstream cause is never exposed.
pub const EXTERNAL_SERVICE_MESSAGE: &str = "Failed to convert currency";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Failures that can end a conversion request. Every variant is surfaced as HTTP 500.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{0}")]
    UpstreamModel(String),
    #[error("{0}")]
    DispatchMismatch(String),
    #[error("{}", EXTERNAL_SERVICE_MESSAGE)]
    ExternalService,
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamModel(_) => "upstream_model",
            Self::DispatchMismatch(_) => "dispatch_mismatch",
            Self::ExternalService => "external_service",
        }
    }

    /// Free-text message placed in the error response body.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

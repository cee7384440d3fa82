//! Agent runtime - LLM-backed intent extraction and tool dispatch
//!
//! The pipeline for one inbound message:
//! 1. **Model call** (`llm`, `gemini`) - the message goes to the model with every
//!    declaration from the `ToolRegistry` attached
//! 2. **Dispatch** (`dispatcher`) - the first function call is looked up by name, its
//!    arguments are checked against the declared schema, and the tool runs
//! 3. **Conversion** (`currency`) - the only registered tool fetches the INR rate table and
//!    converts the amount to USD
//!
//! # Key Types
//!
//! - `AgentRuntime` - owns the model client and the frozen registry (see `runtime`)
//! - `LlmClient` - pluggable model seam, implemented by `GeminiClient`
//! - `RateProvider` - pluggable rate-table seam, implemented by `ExchangeRateApiClient`
//!
//! The model only chooses a tool and extracts arguments. It never produces the converted
//! amount; that arithmetic happens locally against the fetched rate.

pub mod currency;
pub mod dispatcher;
pub mod gemini;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use currency::{conversion_registry, ExchangeRateApiClient, RateProvider, CONVERT_INR_TO_USD};
pub use dispatcher::{DispatchError, DispatchOutcome, IntentDispatcher};
pub use gemini::GeminiClient;
pub use llm::{FunctionCall, LlmClient, LlmError, ModelResponse};
pub use runtime::{AgentError, AgentRuntime};
pub use tools::{Tool, ToolDescriptor, ToolOutput, ToolRegistry};

pub mod config;
pub mod domain;
pub mod errors;

pub use domain::conversion::{Amount, ConversionResult};
pub use errors::{DomainError, PipelineError};

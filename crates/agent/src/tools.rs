use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use fxdesk_core::ConversionResult;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|number| number.fract() == 0.0)
            }
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    pub kind: ParameterType,
    pub description: String,
}

/// Object-typed parameter schema declared to the model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSchema {
    pub properties: BTreeMap<String, ParameterSpec>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, kind: ParameterType, description: &str) -> Self {
        self.required.push(name.to_string());
        self.optional(name, kind, description)
    }

    pub fn optional(mut self, name: &str, kind: ParameterType, description: &str) -> Self {
        self.properties
            .insert(name.to_string(), ParameterSpec { kind, description: description.to_string() });
        self
    }

    /// Checks presence of required arguments and the primitive type of every declared one.
    /// Undeclared arguments are ignored.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), ArgumentError> {
        for name in &self.required {
            match arguments.get(name) {
                None | Some(Value::Null) => {
                    return Err(ArgumentError {
                        argument: name.clone(),
                        reason: "required argument is missing".to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        for (name, spec) in &self.properties {
            let Some(value) = arguments.get(name) else {
                continue;
            };
            if value.is_null() && !self.required.contains(name) {
                continue;
            }
            if !spec.kind.accepts(value) {
                return Err(ArgumentError {
                    argument: name.clone(),
                    reason: format!("expected {}, got {}", spec.kind.as_str(), json_type(value)),
                });
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("argument `{argument}`: {reason}")]
pub struct ArgumentError {
    pub argument: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str, parameters: ParameterSchema) -> Self {
        Self { name: name.to_string(), description: description.to_string(), parameters }
    }
}

/// Arguments of a single function call, already checked against the tool's schema.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn new(arguments: Map<String, Value>) -> Self {
        Self(arguments)
    }

    pub fn number(&self, name: &str) -> Result<f64, ToolError> {
        self.0.get(name).and_then(Value::as_f64).ok_or_else(|| ToolError::InvalidArgument {
            argument: name.to_string(),
            reason: "expected a number".to_string(),
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    Conversion(ConversionResult),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument { argument: String, reason: String },
    /// The cause is kept for logs only; callers see the fixed display text.
    #[error("{}", fxdesk_core::errors::EXTERNAL_SERVICE_MESSAGE)]
    ExternalService { service: &'static str, cause: String },
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<ToolOutput, ToolError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    Duplicate(String),
}

/// Name-keyed dispatch table of the tools offered to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        self.descriptors.push(tool.descriptor().clone());
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Declarations in registration order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

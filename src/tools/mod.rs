pub mod python;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CompanionError, Result};
use crate::llm::FunctionDeclaration;

pub use python::ValidatePythonCodeTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Outcome of a tool run, sent back to the model verbatim as the
/// function response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "status": self.status,
            "message": self.message,
        })
    }
}

/// A local capability the model may ask for.  Tools are pure: they never
/// touch the network or the filesystem and always produce a result.
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Human-readable description for the function declaration.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool.  Missing arguments are defaulted by the tool itself.
    fn execute(&self, args: &Map<String, Value>) -> ToolResult;
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every built-in tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ValidatePythonCodeTool));
        registry
    }

    /// Register a tool. Panics on duplicate names.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        assert!(
            !self.tools.contains_key(&name),
            "duplicate tool name: {name}"
        );
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Function declarations for every registered tool, sorted by name.
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by_key(|t| t.name());
        tools
            .into_iter()
            .map(|t| FunctionDeclaration {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Execute a tool by name after checking the arguments against its schema.
    pub fn execute(&self, name: &str, args: &Map<String, Value>) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| CompanionError::ToolNotFound(name.to_string()))?;
        check_arguments(&tool.parameters_schema(), args)?;
        debug!(tool = name, "executing tool");
        Ok(tool.execute(args))
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject arguments whose JSON type contradicts the declared property type.
/// Absent and undeclared arguments pass through.
fn check_arguments(schema: &Value, args: &Map<String, Value>) -> Result<()> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(expected) = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };

        let matches = match expected.to_ascii_lowercase().as_str() {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            _ => true,
        };

        if !matches {
            return Err(CompanionError::ToolArgument(format!(
                "argument `{key}` must be of type {expected}, got {value}"
            )));
        }
    }

    Ok(())
}

//! Tool trait and the ordered tool registry.
//!
//! Tools are what let the agent act on the monitoring system: create hosts,
//! acknowledge problems, open maintenance windows. The registry is both the
//! catalog shown to the model and the executor the loop calls into.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ToolError;
use crate::message::{Arguments, ContentBlock};
use crate::provider::ToolDefinition;

/// The core Tool trait.
///
/// Arguments have already been validated against `parameters_schema()` when
/// `execute` is called through the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "create_host").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's arguments.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool, returning the text fed back to the model.
    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// An ordered registry of available tools.
///
/// Registration order is catalog order: `definitions()` always lists tools in
/// the order they were registered.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and execute a tool by name.
    pub async fn execute(&self, name: &str, arguments: &Arguments) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        validate_arguments(&tool.parameters_schema(), arguments)?;
        tool.execute(arguments).await
    }

    /// Execute one invocation and turn the result into a `ToolOutcome` block.
    ///
    /// Never fails: every error becomes an outcome with `is_error = true` so
    /// the model can recover conversationally.
    pub async fn run(&self, call_id: &str, name: &str, arguments: &Arguments) -> ContentBlock {
        let args = Value::Object(arguments.clone());
        info!(tool = %name, call_id = %call_id, arguments = %args, "Executing tool");

        match self.execute(name, arguments).await {
            Ok(output) => ContentBlock::outcome(call_id, output, false),
            Err(e) => {
                warn!(tool = %name, call_id = %call_id, error = %e, "Tool execution failed");
                ContentBlock::outcome(call_id, e.to_string(), true)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check arguments against a JSON-schema-shaped contract.
///
/// Supports the subset the catalog uses: `required`, per-property `type`
/// (`string`, `integer`, `number`, `boolean`, `array`, `object`), array
/// `items.type` and `enum`. Integers may arrive as numeric strings. Properties
/// the schema does not mention are ignored.
pub fn validate_arguments(schema: &Value, arguments: &Arguments) -> Result<(), ToolError> {
    if let Some(required) = schema["required"].as_array() {
        for field in required.iter().filter_map(Value::as_str) {
            match arguments.get(field) {
                None | Some(Value::Null) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required argument '{field}'"
                    )));
                }
                Some(_) => {}
            }
        }
    }

    let Some(properties) = schema["properties"].as_object() else {
        return Ok(());
    };

    for (key, value) in arguments {
        let Some(property) = properties.get(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        if let Some(expected) = property["type"].as_str() {
            if !matches_type(expected, value) {
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{key}' must be of type {expected}"
                )));
            }
            if expected == "array" {
                if let (Some(item_type), Some(items)) =
                    (property["items"]["type"].as_str(), value.as_array())
                {
                    if !items.iter().all(|item| matches_type(item_type, item)) {
                        return Err(ToolError::InvalidArguments(format!(
                            "every item of '{key}' must be of type {item_type}"
                        )));
                    }
                }
            }
        }

        if let Some(allowed) = property["enum"].as_array() {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
                return Err(ToolError::InvalidArguments(format!(
                    "argument '{key}' must be one of {}",
                    options.join(", ")
                )));
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_str().is_some_and(|s| s.trim().parse::<i64>().is_ok())
        }
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

// --- Argument accessors for tool implementations ---

/// A required string argument.
pub fn str_arg<'a>(arguments: &'a Arguments, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required argument '{key}'")))
}

/// An optional string argument.
pub fn opt_str_arg<'a>(arguments: &'a Arguments, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

/// An integer argument, accepting JSON numbers or numeric strings.
pub fn int_arg(arguments: &Arguments, key: &str) -> Result<Option<i64>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("argument '{key}' must be an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ToolError::InvalidArguments(format!("argument '{key}' must be an integer"))),
        Some(_) => Err(ToolError::InvalidArguments(format!(
            "argument '{key}' must be an integer"
        ))),
    }
}

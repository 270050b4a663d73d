//! The tool seam between the orchestrator and the tool server.
//!
//! The orchestrator only needs "call this tool with these arguments", so it
//! talks to a [`ToolExecutor`]. [`ToolDispatcher`] is the real one; tests
//! provide their own.

use serde_json::Value;

use tether_llm::ToolSchema;
use tether_mcp::{McpError, ToolCatalog, ToolDescriptor, ToolDispatcher};

/// Something that can execute a named tool.
pub trait ToolExecutor {
    /// Execute `name` with `arguments`, returning the raw result.
    ///
    /// [`McpError::ToolInvocation`] is reported back to the model; any other
    /// error ends the utterance.
    fn execute(&self, name: &str, arguments: &Value) -> Result<Value, McpError>;
}

impl ToolExecutor for ToolDispatcher<'_> {
    fn execute(&self, name: &str, arguments: &Value) -> Result<Value, McpError> {
        self.invoke(name, arguments)
    }
}

impl<T: ToolExecutor + ?Sized> ToolExecutor for &T {
    fn execute(&self, name: &str, arguments: &Value) -> Result<Value, McpError> {
        (**self).execute(name, arguments)
    }
}

/// The completion-API schema for one catalog entry.
pub fn tool_schema(descriptor: &ToolDescriptor) -> ToolSchema {
    ToolSchema::function(
        descriptor.name.clone(),
        descriptor.description.clone(),
        descriptor.input_schema.to_value(),
    )
}

/// Completion-API schemas for a whole catalog, in catalog order.
pub fn tool_schemas(catalog: &ToolCatalog) -> Vec<ToolSchema> {
    catalog.iter().map(tool_schema).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_mcp::InputSchema;

    fn descriptor(name: &str, schema: Option<Value>) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: format!("{} tool", name),
            input_schema: InputSchema::from_raw(schema.as_ref()).unwrap(),
        }
    }

    #[test]
    fn test_tool_schema_from_descriptor() {
        let schema = tool_schema(&descriptor(
            "echo",
            Some(json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            })),
        ));

        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "function",
                "function": {
                    "name": "echo",
                    "description": "echo tool",
                    "parameters": {
                        "type": "object",
                        "properties": {"message": {"type": "string"}},
                        "required": ["message"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_missing_schema_becomes_empty_object() {
        let schema = tool_schema(&descriptor("now", None));
        assert_eq!(
            schema.function.parameters,
            json!({"type": "object", "properties": {}, "required": []})
        );
    }

    #[test]
    fn test_tool_schemas_keep_catalog_order() {
        let catalog = ToolCatalog::from_descriptors(vec![
            descriptor("zeta", None),
            descriptor("alpha", None),
            descriptor("mid", None),
        ]);
        let names: Vec<String> = tool_schemas(&catalog)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}

//! Tool catalog: the normalized `tools/list` result.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::McpClient;
use crate::error::{McpError, Result};
use crate::session::Session;

/// Normalized input schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    /// JSON Schema type of the argument object (almost always `"object"`).
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Named properties.
    pub properties: Map<String, Value>,
    /// Required property names.
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }
}

impl InputSchema {
    /// Normalize a raw `inputSchema` value.
    ///
    /// Missing pieces get defaults. A present but mistyped piece is an error.
    pub fn from_raw(raw: Option<&Value>) -> std::result::Result<Self, String> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        let obj = raw
            .as_object()
            .ok_or_else(|| "inputSchema is not an object".to_string())?;

        let schema_type = match obj.get("type") {
            None | Some(Value::Null) => "object".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err("inputSchema.type is not a string".to_string()),
        };

        let properties = match obj.get("properties") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            // Some servers emit `[]` for an empty property map.
            Some(Value::Array(items)) if items.is_empty() => Map::new(),
            Some(_) => return Err("inputSchema.properties is not an object".to_string()),
        };

        let required = match obj.get("required") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| "inputSchema.required has a non-string entry".to_string())
                })
                .collect::<std::result::Result<_, _>>()?,
            Some(_) => return Err("inputSchema.required is not an array".to_string()),
        };

        Ok(Self {
            schema_type,
            properties,
            required,
        })
    }

    /// The schema as a JSON Schema value suitable for a completion API.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.schema_type,
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// A callable tool advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within the catalog.
    pub name: String,
    /// Human-readable description (empty when the server gave none).
    pub description: String,
    /// Normalized input schema.
    pub input_schema: InputSchema,
}

/// Tool descriptors keyed by name, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    /// Build a catalog from descriptors. On duplicate names the first wins.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut tools = IndexMap::new();
        for descriptor in descriptors {
            if tools.contains_key(&descriptor.name) {
                tracing::warn!(tool = %descriptor.name, "duplicate tool name in catalog, ignoring");
                continue;
            }
            tools.insert(descriptor.name.clone(), descriptor);
        }
        Self { tools }
    }

    /// Parse a de-framed `tools/list` response body.
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| McpError::catalog_parse(format!("response is not JSON: {}", e)))?;

        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            return Err(McpError::catalog_parse(format!(
                "server returned an error: {}",
                error
            )));
        }

        let raw_tools = value
            .get("result")
            .and_then(|r| r.get("tools"))
            .and_then(Value::as_array)
            .ok_or_else(|| McpError::catalog_parse("missing result.tools"))?;

        let descriptors = raw_tools
            .iter()
            .enumerate()
            .map(|(index, raw)| normalize_descriptor(index, raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_descriptors(descriptors))
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Iterate descriptors in server order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn normalize_descriptor(index: usize, raw: &Value) -> Result<ToolDescriptor> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| McpError::catalog_parse(format!("tool #{} has no name", index)))?;

    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let input_schema = InputSchema::from_raw(raw.get("inputSchema"))
        .map_err(|e| McpError::catalog_parse(format!("tool '{}': {}", name, e)))?;

    Ok(ToolDescriptor {
        name: name.to_string(),
        description,
        input_schema,
    })
}

impl McpClient {
    /// Fetch and normalize the tool catalog.
    pub fn fetch_catalog(&self, session: &Session) -> Result<ToolCatalog> {
        let reply = self.send_request("tools/list", None, Some(session.id()))?;
        let catalog = ToolCatalog::parse(&reply.body)?;

        tracing::info!(
            session_id = %session.id(),
            tool_count = catalog.len(),
            "fetched MCP tool catalog"
        );

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_tool() {
        let body = r#"{"result":{"tools":[{"name":"echo","description":"d","inputSchema":{"type":"object","properties":{},"required":[]}}]}}"#;
        let catalog = ToolCatalog::parse(body).unwrap();
        assert_eq!(catalog.len(), 1);
        let echo = catalog.get("echo").unwrap();
        assert_eq!(echo.description, "d");
        assert_eq!(echo.input_schema, InputSchema::default());
    }

    #[test]
    fn test_parse_preserves_order() {
        let body = json!({"result": {"tools": [
            {"name": "zeta"}, {"name": "alpha"}, {"name": "mid"}
        ]}})
        .to_string();
        let catalog = ToolCatalog::parse(&body).unwrap();
        let names: Vec<_> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_duplicate_name_first_wins() {
        let body = json!({"result": {"tools": [
            {"name": "echo", "description": "first"},
            {"name": "echo", "description": "second"}
        ]}})
        .to_string();
        let catalog = ToolCatalog::parse(&body).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("echo").unwrap().description, "first");
    }

    #[test]
    fn test_parse_missing_tools() {
        let err = ToolCatalog::parse(r#"{"result":{}}"#).unwrap_err();
        assert!(matches!(err, McpError::CatalogParse(ref m) if m.contains("result.tools")));
    }

    #[test]
    fn test_parse_error_response() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}}"#;
        let err = ToolCatalog::parse(body).unwrap_err();
        assert!(matches!(err, McpError::CatalogParse(_)));
    }

    #[test]
    fn test_parse_not_json() {
        let err = ToolCatalog::parse("event: message").unwrap_err();
        assert!(matches!(err, McpError::CatalogParse(_)));
    }

    #[test]
    fn test_parse_nameless_tool() {
        let body = json!({"result": {"tools": [{"description": "x"}]}}).to_string();
        assert!(matches!(
            ToolCatalog::parse(&body),
            Err(McpError::CatalogParse(_))
        ));
    }

    #[test]
    fn test_schema_normalization() {
        let raw = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"],
            "additionalProperties": false
        });
        let schema = InputSchema::from_raw(Some(&raw)).unwrap();
        assert_eq!(schema.schema_type, "object");
        assert!(schema.properties.contains_key("city"));
        assert_eq!(schema.required, vec!["city"]);
        assert_eq!(
            schema.to_value(),
            json!({
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"]
            })
        );
    }

    #[test]
    fn test_schema_defaults_and_empty_array_properties() {
        assert_eq!(InputSchema::from_raw(None).unwrap(), InputSchema::default());
        let raw = json!({"properties": []});
        assert_eq!(
            InputSchema::from_raw(Some(&raw)).unwrap(),
            InputSchema::default()
        );
    }

    #[test]
    fn test_schema_rejects_bad_required() {
        let raw = json!({"type": "object", "required": "city"});
        assert!(InputSchema::from_raw(Some(&raw)).is_err());
    }
}

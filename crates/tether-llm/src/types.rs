//! Chat messages and completion requests.
//!
//! These types serialize directly to the OpenAI-compatible wire format, so a
//! [`ChatMessage`] is exactly what goes into the `messages` array.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single role-tagged message.
///
/// `content` is always serialized, as `null` when absent; assistant messages
/// that only carry tool calls rely on that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// A system prompt.
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// A user utterance.
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// An assistant message requesting exactly one tool call, with null content.
    pub fn assistant_tool_call(call: ToolCallRequest) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(vec![call]),
            tool_call_id: None,
            name: None,
        }
    }

    /// The result of a tool call, answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }
}

/// A tool call as echoed back to the model in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCallRequest {
    /// A `function` tool call with raw, unparsed arguments text.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name plus arguments text of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────────────

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionSchema,
}

impl ToolSchema {
    /// A `function` tool.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionSchema {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Name of the tool.
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Name, description and JSON-schema parameters of a function tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// How the model may choose tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered messages submitted in one completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationTurn {
    messages: Vec<ChatMessage>,
}

impl ConversationTurn {
    /// An empty turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn with(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// The messages in order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the turn has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<ChatMessage>> for ConversationTurn {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

/// A streamed chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub turn: ConversationTurn,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: Option<ToolChoice>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// A request without tools or sampling settings.
    pub fn new(model: impl Into<String>, turn: impl Into<ConversationTurn>) -> Self {
        Self {
            model: model.into(),
            turn: turn.into(),
            tools: Vec::new(),
            tool_choice: None,
            temperature: None,
        }
    }

    /// Offer tools to the model.
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the tool choice mode.
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Messages of the turn.
    pub fn messages(&self) -> &[ChatMessage] {
        self.turn.messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_message_serialization() {
        let msg = ChatMessage::user("hello");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "user", "content": "hello"})
        );
    }

    #[test]
    fn test_assistant_tool_call_has_null_content() {
        let msg = ChatMessage::assistant_tool_call(ToolCallRequest::function(
            "call_0",
            "search",
            r#"{"q":"x"}"#,
        ));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_0",
                    "type": "function",
                    "function": {"name": "search", "arguments": "{\"q\":\"x\"}"}
                }]
            })
        );
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_0", "search", "{\"hits\":3}");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "tool",
                "content": "{\"hits\":3}",
                "tool_call_id": "call_0",
                "name": "search"
            })
        );
    }

    #[test]
    fn test_tool_schema_serialization() {
        let schema = ToolSchema::function(
            "echo",
            "Echo back the input",
            json!({"type": "object", "properties": {}, "required": []}),
        );
        assert_eq!(schema.name(), "echo");
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "function",
                "function": {
                    "name": "echo",
                    "description": "Echo back the input",
                    "parameters": {"type": "object", "properties": {}, "required": []}
                }
            })
        );
    }

    #[test]
    fn test_tool_choice_serialization() {
        assert_eq!(serde_json::to_value(ToolChoice::Auto).unwrap(), json!("auto"));
        assert_eq!(serde_json::to_value(ToolChoice::None).unwrap(), json!("none"));
    }

    #[test]
    fn test_request_builder() {
        let turn = ConversationTurn::new()
            .with(ChatMessage::system("be brief"))
            .with(ChatMessage::user("hi"));
        let request = CompletionRequest::new("deepseek-chat", turn)
            .with_tool_choice(ToolChoice::Auto)
            .with_temperature(0.7);

        assert_eq!(request.model, "deepseek-chat");
        assert_eq!(request.messages().len(), 2);
        assert_eq!(request.messages()[0].role, Role::System);
        assert_eq!(request.tool_choice, Some(ToolChoice::Auto));
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.tools.is_empty());
    }
}

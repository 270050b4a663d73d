//! Tool dispatcher: one `tools/call` per reconstructed tool call.

use serde_json::Value;

use crate::client::McpClient;
use crate::error::{McpError, Result};
use crate::protocol::{CallToolParams, CallToolResult};
use crate::session::Session;

/// Invokes tools on the server within a ready session.
///
/// A single attempt per call; errors are returned to the caller so they can
/// be reported back to the model.
#[derive(Debug, Clone, Copy)]
pub struct ToolDispatcher<'a> {
    client: &'a McpClient,
    session: &'a Session,
}

impl<'a> ToolDispatcher<'a> {
    /// Create a dispatcher for the given client and session.
    pub fn new(client: &'a McpClient, session: &'a Session) -> Self {
        Self { client, session }
    }

    /// Call `name` with `arguments` and return the raw `result` value.
    ///
    /// JSON-RPC errors (e.g. an unknown tool), results flagged `isError`, and
    /// non-2xx statuses all become [`McpError::ToolInvocation`].
    pub fn invoke(&self, name: &str, arguments: &Value) -> Result<Value> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: arguments.clone(),
        };

        tracing::debug!(
            session_id = %self.session.id(),
            tool = %name,
            arguments = %arguments,
            "calling MCP tool"
        );

        let reply = self
            .client
            .send_request(
                "tools/call",
                Some(serde_json::to_value(&params)?),
                Some(self.session.id()),
            )
            .map_err(|e| match e {
                McpError::HttpStatus { .. } => McpError::tool_invocation(name, e.to_string()),
                other => other,
            })?;

        let response = reply.json_rpc().map_err(|e| {
            McpError::tool_invocation(name, format!("unreadable response: {}", e))
        })?;

        let result = response
            .into_result()
            .map_err(|e| McpError::tool_invocation(name, e.to_string()))?;

        let view = match serde_json::from_value::<CallToolResult>(result.clone()) {
            Ok(view) => view,
            Err(e) => {
                tracing::debug!(
                    tool = %name,
                    error = %e,
                    "tool result is not a standard CallToolResult, returning it as is"
                );
                CallToolResult::default()
            }
        };
        if view.is_error() {
            tracing::warn!(tool = %name, "tool call returned error");
            let text = view.text();
            let message = if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            };
            return Err(McpError::tool_invocation(name, message));
        }

        tracing::debug!(tool = %name, "tool call succeeded");
        Ok(result)
    }
}

//! Error types for MCP operations.

use thiserror::Error;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The initialize exchange did not yield a usable session.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The tools/list response did not have the expected shape.
    #[error("failed to parse tool catalog: {0}")]
    CatalogParse(String),

    /// The tool server rejected a tools/call request.
    #[error("tool '{tool}' failed: {message}")]
    ToolInvocation {
        /// Name of the tool that was called.
        tool: String,
        /// Description of the failure.
        message: String,
    },

    /// Failed to communicate with the MCP server.
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a non-success HTTP status.
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as received.
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Create a handshake error.
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Create a catalog parse error.
    pub fn catalog_parse(msg: impl Into<String>) -> Self {
        Self::CatalogParse(msg.into())
    }

    /// Create a tool invocation error.
    pub fn tool_invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

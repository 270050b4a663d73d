//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for agent operations.
///
/// Tool argument and tool invocation failures are not here: they are reported
/// to the model and recorded in the turn report instead.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Completion backend error.
    #[error("LLM error: {0}")]
    Llm(#[from] tether_llm::LlmError),

    /// Tool server error that could not be reported to the model.
    #[error("MCP error: {0}")]
    Mcp(#[from] tether_mcp::McpError),

    /// Writing to the output sink failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: AgentError = tether_llm::LlmError::Auth("bad key".to_string()).into();
        assert!(err.to_string().starts_with("LLM error:"));

        let err: AgentError = tether_mcp::McpError::transport("connection refused").into();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: AgentError = io.into();
        assert!(matches!(err, AgentError::Output(_)));
    }
}

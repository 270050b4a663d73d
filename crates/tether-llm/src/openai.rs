//! OpenAI-compatible API backend implementation.
//!
//! This module provides `OpenAiBackend`, which connects to DeepSeek, OpenAI,
//! or any service exposing an OpenAI-style `/chat/completions` endpoint.

use std::io::BufReader;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::backend::CompletionBackend;
use crate::error::{LlmError, Result};
use crate::stream::{DeltaStream, SseDeltaReader};
use crate::types::{ChatMessage, CompletionRequest, ToolChoice, ToolSchema};

/// Default DeepSeek API base URL.
pub const DEFAULT_DEEPSEEK_BASE: &str = "https://api.deepseek.com/v1";

/// Default OpenAI API base URL.
const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the OpenAI-compatible backend.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token (optional for local services).
    pub api_key: Option<String>,

    /// Base URL for the API.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Name for this backend instance.
    pub name: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("name", &self.name)
            .finish()
    }
}

impl OpenAiConfig {
    /// Create a new config for DeepSeek.
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_DEEPSEEK_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            name: "deepseek".to_string(),
        }
    }

    /// Create a new config for OpenAI.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            name: "openai".to_string(),
        }
    }

    /// Create a config for an arbitrary compatible endpoint, without a key.
    pub fn compatible(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            name: "openai-compatible".to_string(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the backend name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Blocking OpenAI-compatible API backend.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Add authentication headers to a request.
    fn add_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream");

        if let Some(ref api_key) = self.config.api_key {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", api_key))
        } else {
            builder
        }
    }

    /// Convert a completion request to the wire format.
    fn to_openai_request<'a>(&self, request: &'a CompletionRequest) -> OpenAiChatRequest<'a> {
        let has_tools = !request.tools.is_empty();
        OpenAiChatRequest {
            model: &request.model,
            messages: request.messages(),
            tools: has_tools.then_some(request.tools.as_slice()),
            tool_choice: if has_tools { request.tool_choice } else { None },
            temperature: request.temperature,
            stream: true,
        }
    }

    /// Turn a non-success response into an error.
    fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();
        let body = response.text().unwrap_or_default();

        match serde_json::from_str::<OpenAiErrorResponse>(&body) {
            Ok(error) => LlmError::from_status(status.as_u16(), error.error.message),
            Err(_) => LlmError::from_status(status.as_u16(), format!("HTTP {}: {}", status, body)),
        }
    }
}

impl CompletionBackend for OpenAiBackend {
    fn complete_stream(&self, request: &CompletionRequest) -> Result<DeltaStream> {
        let openai_request = self.to_openai_request(request);

        tracing::debug!(
            backend = %self.config.name,
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            tools = openai_request.tools.map(|t| t.len()).unwrap_or(0),
            "sending streamed completion request"
        );

        let response = self
            .add_headers(self.client.post(self.completions_url()))
            .json(&openai_request)
            .send()?;

        if !response.status().is_success() {
            let err = Self::handle_error_response(response);
            tracing::warn!(backend = %self.config.name, error = %err, "completion request failed");
            return Err(err);
        }

        Ok(Box::new(SseDeltaReader::new(BufReader::new(response))))
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSchema]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConversationTurn, ToolCallRequest};
    use serde_json::json;

    #[test]
    fn test_deepseek_config() {
        let config = OpenAiConfig::deepseek("test-key");
        assert_eq!(config.api_key, Some("test-key".to_string()));
        assert_eq!(config.base_url, DEFAULT_DEEPSEEK_BASE);
        assert_eq!(config.name, "deepseek");
        assert_eq!(config.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_config_builder() {
        let config = OpenAiConfig::compatible("http://localhost:11434/v1")
            .with_api_key("key")
            .with_name("local")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.name, "local");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = OpenAiConfig::openai("sk-very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_completions_url() {
        let backend = OpenAiBackend::new(OpenAiConfig::deepseek("key")).unwrap();
        assert_eq!(
            backend.completions_url(),
            "https://api.deepseek.com/v1/chat/completions"
        );

        let backend =
            OpenAiBackend::new(OpenAiConfig::compatible("http://localhost:8080/v1/")).unwrap();
        assert_eq!(
            backend.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_backend_name() {
        let backend = OpenAiBackend::new(OpenAiConfig::openai("key")).unwrap();
        assert_eq!(backend.name(), "openai");
    }

    #[test]
    fn test_to_openai_request_with_tools() {
        let backend = OpenAiBackend::new(OpenAiConfig::deepseek("key")).unwrap();
        let request = CompletionRequest::new(
            "deepseek-chat",
            ConversationTurn::new()
                .with(ChatMessage::system("sys"))
                .with(ChatMessage::user("hi")),
        )
        .with_tools(vec![ToolSchema::function(
            "echo",
            "Echo",
            json!({"type": "object", "properties": {}, "required": []}),
        )])
        .with_tool_choice(ToolChoice::Auto)
        .with_temperature(0.7);

        let body = serde_json::to_value(backend.to_openai_request(&request)).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], true);
        assert_eq!(body["tool_choice"], "auto");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "echo");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_to_openai_request_without_tools() {
        let backend = OpenAiBackend::new(OpenAiConfig::deepseek("key")).unwrap();
        let request = CompletionRequest::new(
            "deepseek-chat",
            ConversationTurn::new()
                .with(ChatMessage::assistant_tool_call(ToolCallRequest::function(
                    "call_0", "echo", "{}",
                )))
                .with(ChatMessage::tool_result("call_0", "echo", "{}")),
        )
        .with_tool_choice(ToolChoice::Auto);

        let body = serde_json::to_value(backend.to_openai_request(&request)).unwrap();
        let obj = body.as_object().unwrap();
        assert!(!obj.contains_key("tools"));
        assert!(!obj.contains_key("tool_choice"));
        assert!(!obj.contains_key("temperature"));
        assert!(body["messages"][0]["content"].is_null());
        assert_eq!(body["messages"][1]["tool_call_id"], "call_0");
    }
}

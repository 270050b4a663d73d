//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [llm]
//! base_url = "https://api.deepseek.com/v1"
//! model = "deepseek-chat"
//! temperature = 0.7
//! api_key_env = "TETHER_API_KEY"
//!
//! [mcp]
//! url = "http://localhost:8000/mcp/"
//! headers = { Authorization = "Bearer ..." }
//!
//! [agent]
//! system_prompt = "..."
//!
//! [logging]
//! dir = "/var/log/tether"
//! ```
//!
//! Every field is optional so that partial layers can be merged; the
//! accessor methods fill in defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default completion API base URL.
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion request timeout in seconds.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;

/// Default MCP endpoint.
pub const DEFAULT_MCP_URL: &str = "http://localhost:8000/mcp/";

/// Default MCP protocol version requested at initialize.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Default MCP request timeout in seconds.
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Completion API settings.
    pub llm: LlmConfig,
    /// Tool server settings.
    pub mcp: McpConfig,
    /// Agent behavior.
    pub agent: AgentConfig,
    /// Log file settings.
    pub logging: LoggingConfig,
}

impl TetherConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Merging is per field: a layer that only sets `llm.model` keeps the
    /// `llm.base_url` of the layers beneath it.
    pub fn merge(&mut self, other: TetherConfig) {
        self.llm.merge(other.llm);
        self.mcp.merge(other.mcp);
        self.agent.merge(other.agent);
        self.logging.merge(other.logging);
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        let temperature = self.llm.temperature();
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }
        if self.llm.base_url().trim().is_empty() {
            return Err(ConfigError::invalid("llm.base_url", "must not be empty"));
        }
        if self.mcp.url().trim().is_empty() {
            return Err(ConfigError::invalid("mcp.url", "must not be empty"));
        }
        if self.llm.timeout_secs == Some(0) {
            return Err(ConfigError::invalid("llm.timeout_secs", "must be positive"));
        }
        if self.mcp.timeout_secs == Some(0) {
            return Err(ConfigError::invalid("mcp.timeout_secs", "must be positive"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [llm]
// ─────────────────────────────────────────────────────────────────────────────

/// Completion API configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL; `/chat/completions` is appended.
    pub base_url: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// API key (prefer an env var; warns if set here).
    pub api_key: Option<String>,
    /// Name of the env var holding the API key.
    pub api_key_env: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    fn merge(&mut self, other: LlmConfig) {
        merge_field(&mut self.base_url, other.base_url);
        merge_field(&mut self.model, other.model);
        merge_field(&mut self.temperature, other.temperature);
        merge_field(&mut self.api_key, other.api_key);
        merge_field(&mut self.api_key_env, other.api_key_env);
        merge_field(&mut self.timeout_secs, other.timeout_secs);
    }

    /// Returns true if an API key is stored directly in the config file.
    pub fn has_plaintext_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_LLM_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [mcp]
// ─────────────────────────────────────────────────────────────────────────────

/// Tool server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Streamable-HTTP endpoint.
    pub url: Option<String>,
    /// Protocol version requested at initialize.
    pub protocol_version: Option<String>,
    /// Client name announced at initialize.
    pub client_name: Option<String>,
    /// Client version announced at initialize.
    pub client_version: Option<String>,
    /// Static headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl McpConfig {
    fn merge(&mut self, other: McpConfig) {
        merge_field(&mut self.url, other.url);
        merge_field(&mut self.protocol_version, other.protocol_version);
        merge_field(&mut self.client_name, other.client_name);
        merge_field(&mut self.client_version, other.client_version);
        merge_field(&mut self.timeout_secs, other.timeout_secs);
        self.headers.extend(other.headers);
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_MCP_URL)
    }

    pub fn protocol_version(&self) -> &str {
        self.protocol_version
            .as_deref()
            .unwrap_or(DEFAULT_PROTOCOL_VERSION)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_MCP_TIMEOUT_SECS))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [agent] / [logging]
// ─────────────────────────────────────────────────────────────────────────────

/// Agent behavior configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl AgentConfig {
    fn merge(&mut self, other: AgentConfig) {
        merge_field(&mut self.system_prompt, other.system_prompt);
    }
}

/// Log file configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the rolling log file.
    pub dir: Option<PathBuf>,
    /// Filter directive for the log file (e.g. `debug`, `tether_agent=trace`).
    pub level: Option<String>,
}

impl LoggingConfig {
    fn merge(&mut self, other: LoggingConfig) {
        merge_field(&mut self.dir, other.dir);
        merge_field(&mut self.level, other.level);
    }
}

fn merge_field<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TetherConfig::from_toml("").unwrap();
        assert_eq!(config.llm.base_url(), DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.model(), "deepseek-chat");
        assert_eq!(config.llm.temperature(), 0.7);
        assert_eq!(config.llm.timeout(), Duration::from_secs(300));
        assert_eq!(config.mcp.url(), "http://localhost:8000/mcp/");
        assert_eq!(config.mcp.protocol_version(), "2024-11-05");
        assert_eq!(config.mcp.timeout(), Duration::from_secs(30));
        assert!(config.agent.system_prompt.is_none());
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = TetherConfig::from_toml(
            r#"
[llm]
base_url = "http://localhost:11434/v1"
model = "qwen2.5"
temperature = 0.2
api_key_env = "LOCAL_KEY"
timeout_secs = 60

[mcp]
url = "http://tools.internal/mcp/"
client_name = "Cline"
client_version = "3.12.3"
timeout_secs = 5

[mcp.headers]
Authorization = "Bearer abc"

[agent]
system_prompt = "Be brief."

[logging]
dir = "/tmp/tether-logs"
level = "debug"
"#,
        )
        .unwrap();

        assert_eq!(config.llm.base_url(), "http://localhost:11434/v1");
        assert_eq!(config.llm.model(), "qwen2.5");
        assert_eq!(config.llm.temperature(), 0.2);
        assert_eq!(config.llm.api_key_env.as_deref(), Some("LOCAL_KEY"));
        assert_eq!(config.llm.timeout(), Duration::from_secs(60));
        assert_eq!(config.mcp.url(), "http://tools.internal/mcp/");
        assert_eq!(config.mcp.client_name.as_deref(), Some("Cline"));
        assert_eq!(config.mcp.headers["Authorization"], "Bearer abc");
        assert_eq!(config.mcp.timeout(), Duration::from_secs(5));
        assert_eq!(config.agent.system_prompt.as_deref(), Some("Be brief."));
        assert_eq!(config.logging.dir, Some(PathBuf::from("/tmp/tether-logs")));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = TetherConfig::from_toml(
            r#"
[llm]
model = "m"
retry_max = 3

[server]
port = 8080
"#,
        )
        .unwrap();
        assert_eq!(config.llm.model(), "m");
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = TetherConfig::from_toml("[llm]\ntemperature = \"hot\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_merge_is_per_field() {
        let mut base = TetherConfig::from_toml(
            r#"
[llm]
base_url = "http://base/v1"
model = "base-model"

[mcp]
url = "http://base/mcp/"
[mcp.headers]
X-Team = "core"
"#,
        )
        .unwrap();
        let layer = TetherConfig::from_toml(
            r#"
[llm]
model = "layer-model"

[mcp.headers]
Authorization = "Bearer t"
"#,
        )
        .unwrap();

        base.merge(layer);

        assert_eq!(base.llm.base_url(), "http://base/v1");
        assert_eq!(base.llm.model(), "layer-model");
        assert_eq!(base.mcp.url(), "http://base/mcp/");
        assert_eq!(base.mcp.headers.len(), 2);
        assert_eq!(base.mcp.headers["Authorization"], "Bearer t");
    }

    #[test]
    fn test_plaintext_key_detection() {
        let config = TetherConfig::from_toml("[llm]\napi_key = \"sk-secret\"\n").unwrap();
        assert!(config.llm.has_plaintext_api_key());
        assert!(!TetherConfig::new().llm.has_plaintext_api_key());
    }

    #[test]
    fn test_validate_defaults_ok() {
        assert!(TetherConfig::new().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let config = TetherConfig::from_toml("[llm]\ntemperature = 3.5\n").unwrap();
        match config.validate().unwrap_err() {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "llm.temperature"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_empty_url_and_zero_timeout() {
        let config = TetherConfig::from_toml("[mcp]\nurl = \"  \"\n").unwrap();
        assert!(config.validate().is_err());

        let config = TetherConfig::from_toml("[mcp]\ntimeout_secs = 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}

//! CLI command handlers and the startup wiring they share.

pub mod ask;
pub mod chat;
pub mod repl;
pub mod tools;

use anyhow::{Context as _, Result};
use tether_agent::AgentConfig;
use tether_config::TetherConfig;
use tether_llm::{OpenAiBackend, OpenAiConfig};
use tether_mcp::{McpClient, McpServerConfig, Session, ToolCatalog};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration with CLI overrides applied.
    pub config: TetherConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}

/// A connected tool server: the client, its ready session and the catalog.
pub struct ToolServer {
    pub client: McpClient,
    pub session: Session,
    pub catalog: ToolCatalog,
}

impl Context {
    /// Run the MCP handshake and fetch the catalog.
    pub fn open_tool_server(&self) -> Result<ToolServer> {
        let mcp = &self.config.mcp;
        let mut server_config = McpServerConfig::new(mcp.url())
            .with_protocol_version(mcp.protocol_version())
            .with_timeout(mcp.timeout());
        if let Some(name) = &mcp.client_name {
            let version = mcp
                .client_version
                .as_deref()
                .unwrap_or(env!("CARGO_PKG_VERSION"));
            server_config = server_config.with_client_info(name, version);
        }
        for (key, value) in &mcp.headers {
            server_config = server_config.with_header(key, value);
        }

        let client = McpClient::connect(server_config)?;
        let (session, catalog) = client
            .open()
            .with_context(|| format!("failed to start MCP session with {}", mcp.url()))?;

        tracing::info!(
            url = %mcp.url(),
            session_id = %session.id(),
            tools = catalog.len(),
            "MCP session ready"
        );

        Ok(ToolServer {
            client,
            session,
            catalog,
        })
    }

    /// Build the completion backend, resolving the API key.
    ///
    /// A missing key is logged and requests go out without authorization.
    pub fn completion_backend(&self) -> Result<OpenAiBackend> {
        let llm = &self.config.llm;
        let mut backend_config = OpenAiConfig::compatible(llm.base_url()).with_timeout(llm.timeout());

        match tether_config::resolve_api_key(llm) {
            Some(secret) => {
                tracing::debug!(source = %secret.source, "resolved completion API key");
                backend_config = backend_config.with_api_key(secret.value);
            }
            None => {
                tracing::warn!(
                    base_url = %llm.base_url(),
                    "no completion API key found; set {} or [llm] api_key_env",
                    tether_config::DEFAULT_API_KEY_ENV
                );
            }
        }

        OpenAiBackend::new(backend_config).context("failed to create completion backend")
    }

    /// Agent settings from `[llm]` and `[agent]`.
    pub fn agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::default()
            .with_model(self.config.llm.model())
            .with_temperature(self.config.llm.temperature());
        if let Some(prompt) = &self.config.agent.system_prompt {
            config = config.with_system_prompt(prompt.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(toml: &str) -> Context {
        Context {
            config: TetherConfig::from_toml(toml).unwrap(),
            verbose: false,
        }
    }

    #[test]
    fn test_agent_config_defaults() {
        let config = context("").agent_config();
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.system_prompt, tether_agent::DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_agent_config_from_sections() {
        let config = context(
            r#"
[llm]
model = "qwen2.5"
temperature = 0.1

[agent]
system_prompt = "Answer in one line."
"#,
        )
        .agent_config();
        assert_eq!(config.model, "qwen2.5");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.system_prompt, "Answer in one line.");
    }

    #[test]
    fn test_completion_backend_builds() {
        let backend = context("[llm]\nbase_url = \"http://localhost:11434/v1\"\n")
            .completion_backend()
            .unwrap();
        assert_eq!(tether_llm::CompletionBackend::name(&backend), "openai-compatible");
    }
}

//! API key resolution.
//!
//! Resolution order:
//! 1. The env var named by `llm.api_key_env`, or `TETHER_API_KEY` then
//!    `OPENAI_KEY` when none is named
//! 2. `llm.api_key` from the config file (with warning)

use crate::LlmConfig;

/// Env var checked first when `llm.api_key_env` is unset.
pub const DEFAULT_API_KEY_ENV: &str = "TETHER_API_KEY";

/// Env var checked second when `llm.api_key_env` is unset.
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_KEY";

/// Result of API key resolution with provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    /// The secret value.
    pub value: String,
    /// Where the secret was found.
    pub source: SecretSource,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext, not recommended).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Resolve the completion API key from the process environment and config.
pub fn resolve_api_key(llm: &LlmConfig) -> Option<ResolvedSecret> {
    resolve_api_key_with(llm, |name| std::env::var(name).ok())
}

/// Resolve the completion API key with a custom env lookup.
pub fn resolve_api_key_with<F>(llm: &LlmConfig, lookup: F) -> Option<ResolvedSecret>
where
    F: Fn(&str) -> Option<String>,
{
    for name in env_candidates(llm) {
        if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
            return Some(ResolvedSecret {
                value,
                source: SecretSource::EnvVar(name.to_string()),
            });
        }
    }

    llm.api_key
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.clone(),
            source: SecretSource::ConfigFile,
        })
}

fn env_candidates(llm: &LlmConfig) -> Vec<&str> {
    match llm.api_key_env.as_deref() {
        Some(name) => vec![name],
        None => vec![DEFAULT_API_KEY_ENV, FALLBACK_API_KEY_ENV],
    }
}

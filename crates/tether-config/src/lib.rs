//! Configuration system for Tether.
//!
//! Provides TOML-based configuration with:
//! - `[llm]`, `[mcp]`, `[agent]` and `[logging]` sections, every field optional
//! - Config file layering (user config dir, then `./tether.toml`, then `--config`)
//! - API key resolution (env var, then config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, DiscoveryOptions, LoadedConfig, default_log_dir, load_config,
    load_config_file, load_config_with_options, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{
    DEFAULT_API_KEY_ENV, FALLBACK_API_KEY_ENV, ResolvedSecret, SecretSource, resolve_api_key,
    resolve_api_key_with,
};
pub use types::*;

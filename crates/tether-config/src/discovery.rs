//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/config.toml` (`TETHER_CONFIG_DIR` or the platform config dir)
//! 2. `./tether.toml` (project-local)
//! 3. An explicit `--config` file
//! 4. CLI flags (handled by the binary)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TetherConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "tether.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "tether";

/// Environment variable to override the config directory.
pub const CONFIG_DIR_ENV: &str = "TETHER_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: TetherConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (e.g. plaintext API keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Where to look for config layers.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Overrides `TETHER_CONFIG_DIR` and the platform default.
    pub config_dir: Option<PathBuf>,
    /// Directory searched for `tether.toml`; the working directory if unset.
    pub project_dir: Option<PathBuf>,
    /// Explicit config file, merged last. Must exist.
    pub explicit: Option<PathBuf>,
}

/// Load configuration from the default locations plus an optional explicit file.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(&DiscoveryOptions {
        explicit: explicit.map(Path::to_path_buf),
        ..Default::default()
    })
}

/// Load configuration with explicit control over every search location.
///
/// Discovered layers that fail to parse are skipped with a warning. An
/// explicit file is different: the user asked for it, so a missing or
/// malformed one is an error.
pub fn load_config_with_options(options: &DiscoveryOptions) -> Result<LoadedConfig> {
    let mut config = TetherConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match &options.config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = options
        .project_dir
        .as_ref()
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    if let Some(path) = &options.explicit {
        let layer = load_config_file(path)?;
        config.merge(layer);
        sources.push(ConfigSource {
            path: path.clone(),
            loaded: true,
        });
    }

    if config.llm.has_plaintext_api_key() {
        warnings.push(
            "[llm] contains a plaintext API key. \
             Consider setting it through an environment variable instead."
                .to_string(),
        );
    }

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<TetherConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    TetherConfig::from_toml(&contents)
}

/// The user config file path.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory.
///
/// Checks `TETHER_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/tether` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Default directory for log files: `<config dir>/logs`.
pub fn default_log_dir() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join("logs"))
}

fn load_layer(config: &mut TetherConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            tracing::debug!(path = %path.display(), "loaded config layer");
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

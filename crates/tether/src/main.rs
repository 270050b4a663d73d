//! Tether - streaming tool-calling chat agent over MCP
//!
//! Main entry point for the Tether CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{ask, chat, tools};

/// Crates whose events reach the console with `--verbose` and the log file by default.
const TETHER_TARGETS: &[&str] = &[
    "tether",
    "tether_agent",
    "tether_llm",
    "tether_mcp",
    "tether_config",
];

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tether - chat with a model that can call tools on an MCP server
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file merged over the discovered ones
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// MCP server endpoint (overrides [mcp] url)
    #[arg(long, global = true, env = "TETHER_MCP_URL", value_name = "URL")]
    pub mcp_url: Option<String>,

    /// Completion model (overrides [llm] model)
    #[arg(long, global = true, env = "TETHER_MODEL", value_name = "NAME")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter interactive chat mode (the default)
    Chat(chat::ChatArgs),

    /// Ask a one-shot question
    Ask(ask::AskArgs),

    /// List the tools offered by the MCP server
    Tools(tools::ToolsArgs),
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Chat(chat::ChatArgs::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The log directory comes from config; a load failure is reported after
    // tracing is up.
    let loaded = tether_config::load_config(cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|l| l.config.logging.clone())
        .unwrap_or_default();
    let log_dir = logging
        .dir
        .or_else(tether_config::default_log_dir)
        .unwrap_or_else(|| PathBuf::from("logs"));
    let _guard = init_tracing(cli.verbose, &log_dir, logging.level.as_deref());

    let loaded = loaded.context("failed to load configuration")?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.loaded_from(), "configuration loaded");

    let mut config = loaded.config;
    if let Some(url) = cli.mcp_url {
        config.mcp.url = Some(url);
    }
    if let Some(model) = cli.model {
        config.llm.model = Some(model);
    }
    config.validate().context("invalid configuration")?;

    let ctx = commands::Context {
        config,
        verbose: cli.verbose,
    };

    match cli.command.unwrap_or_default() {
        Commands::Chat(args) => chat::run(args, &ctx),
        Commands::Ask(args) => ask::run(args, &ctx),
        Commands::Tools(args) => tools::run(args, &ctx),
    }
}

/// Console (human-readable, stderr) plus a daily rolling JSON file.
///
/// The file layer is skipped if the log directory cannot be used.
fn init_tracing(verbose: bool, log_dir: &Path, file_level: Option<&str>) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let console_filter = if verbose {
        directives("debug", "warn")
    } else {
        "warn".to_string()
    };
    let file_filter = file_level
        .map(str::to_string)
        .unwrap_or_else(|| directives("trace", "info"));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("tether.log")
        .build(log_dir);
    let (file_layer, guard) = match appender {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(file_filter));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "warning: not writing log file to {}: {}",
                log_dir.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(console_filter)),
        )
        .with(file_layer)
        .init();

    guard
}

/// `tether=<level>,tether_agent=<level>,...,<fallback>`
fn directives(level: &str, fallback: &str) -> String {
    let mut parts: Vec<String> = TETHER_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    parts.push(fallback.to_string());
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_defaults_to_chat() {
        let cli = Cli::try_parse_from(["tether"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(cli.command.unwrap_or_default(), Commands::Chat(_)));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tether",
            "ask",
            "hello",
            "--mcp-url",
            "http://tools/mcp/",
            "--model",
            "m",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.mcp_url.as_deref(), Some("http://tools/mcp/"));
        assert_eq!(cli.model.as_deref(), Some("m"));
        match cli.command {
            Some(Commands::Ask(args)) => assert_eq!(args.prompt, "hello"),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_directives() {
        assert_eq!(
            directives("debug", "warn"),
            "tether=debug,tether_agent=debug,tether_llm=debug,tether_mcp=debug,tether_config=debug,warn"
        );
    }
}

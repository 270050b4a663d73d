//! Ask command - one-shot question to the agent.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use console::Style;
use tether_agent::TurnOrchestrator;
use tether_mcp::ToolDispatcher;

use super::Context;
use super::repl::print_report;

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question or prompt to send
    #[arg(required = true)]
    pub prompt: String,
}

/// Run the ask command.
pub fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let server = ctx.open_tool_server()?;
    let backend = ctx.completion_backend()?;
    let orchestrator = TurnOrchestrator::new(
        backend,
        ToolDispatcher::new(&server.client, &server.session),
        &server.catalog,
        ctx.agent_config(),
    );

    if ctx.verbose {
        let dim = Style::new().dim();
        eprintln!(
            "{}",
            dim.apply_to(format!(
                "Model: {} | Tools: {}",
                orchestrator.config().model,
                server.catalog.len()
            ))
        );
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = orchestrator.handle_utterance(&args.prompt, &mut out)?;
    writeln!(out)?;
    drop(out);

    if ctx.verbose {
        print_report(&report);
    }
    Ok(())
}

//! Chat command - interactive REPL mode.

use anyhow::Result;
use clap::Args;
use tether_agent::TurnOrchestrator;
use tether_mcp::ToolDispatcher;

use super::Context;
use super::repl::Repl;
use super::tools::print_catalog;

/// Arguments for the chat command.
#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Don't print the tool catalog on startup
    #[arg(short, long)]
    pub quiet: bool,
}

/// Run the chat command (REPL).
pub fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let server = ctx.open_tool_server()?;
    if !args.quiet {
        print_catalog(&server.catalog);
    }

    let backend = ctx.completion_backend()?;
    let orchestrator = TurnOrchestrator::new(
        backend,
        ToolDispatcher::new(&server.client, &server.session),
        &server.catalog,
        ctx.agent_config(),
    );

    let mut repl = Repl::new(orchestrator, ctx.verbose)?;
    repl.run()
}

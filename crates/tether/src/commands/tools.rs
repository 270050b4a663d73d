//! Tools command - list the tools offered by the MCP server.

use anyhow::Result;
use clap::Args;
use console::Style;
use tether_mcp::ToolCatalog;

use super::Context;

/// Arguments for the tools command.
#[derive(Args, Debug, Default)]
pub struct ToolsArgs {
    /// Print the tool schemas sent to the model, as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the tools command.
pub fn run(args: ToolsArgs, ctx: &Context) -> Result<()> {
    let server = ctx.open_tool_server()?;

    if args.json {
        let schemas = tether_agent::tool_schemas(&server.catalog);
        println!("{}", serde_json::to_string_pretty(&schemas)?);
    } else {
        print_catalog(&server.catalog);
    }
    Ok(())
}

/// Print each tool's name and description, in server order.
pub fn print_catalog(catalog: &ToolCatalog) {
    let dim = Style::new().dim();

    if catalog.is_empty() {
        println!("{}", dim.apply_to("(the server offers no tools)"));
        return;
    }

    for tool in catalog.iter() {
        println!("{}", console::style(&tool.name).bold().cyan());
        if !tool.description.is_empty() {
            println!("  {}", tool.description);
        }
        println!("{}", dim.apply_to("─".repeat(40)));
    }
}

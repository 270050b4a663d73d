//! REPL (Read-Eval-Print Loop) implementation for interactive chat.

use std::io::Write;

use anyhow::Result;
use console::{Style, style};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use tether_agent::{CallOutcome, ToolExecutor, TurnOrchestrator, TurnReport};
use tether_llm::CompletionBackend;

/// The input that ends the session.
const EXIT_COMMAND: &str = "exit";

/// REPL state and configuration.
pub struct Repl<B, E> {
    orchestrator: TurnOrchestrator<B, E>,
    editor: Editor<(), DefaultHistory>,
    verbose: bool,
}

impl<B, E> Repl<B, E>
where
    B: CompletionBackend,
    E: ToolExecutor,
{
    /// Create a new REPL instance.
    pub fn new(orchestrator: TurnOrchestrator<B, E>, verbose: bool) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();

        let editor = Editor::with_config(config)?;

        Ok(Self {
            orchestrator,
            editor,
            verbose,
        })
    }

    /// Run the REPL loop until `exit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = format!("{} ", style("tether>").cyan().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }
                    if line == EXIT_COMMAND {
                        break;
                    }

                    // A failed utterance ends only that utterance.
                    if let Err(e) = self.send_message(line) {
                        tracing::error!(error = %e, "utterance failed");
                        println!();
                        print_error(&format!("{:#}", e));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    print_dim("(Interrupted - type exit or press Ctrl+D to quit)");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        print_dim("Goodbye!");
        Ok(())
    }

    /// Send one utterance and stream the reply.
    fn send_message(&mut self, message: &str) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let report = self.orchestrator.handle_utterance(message, &mut out)?;
        writeln!(out)?;
        writeln!(out)?;
        drop(out);

        tracing::debug!(
            content_chars = report.content.len(),
            calls = report.calls.len(),
            completed = report.completed_calls(),
            "utterance handled"
        );
        if self.verbose {
            print_report(&report);
        }
        Ok(())
    }

    fn print_welcome(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Tether Chat").bold().cyan());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!(
            "{}",
            dim.apply_to(format!(
                "Model {} with {} tool(s).",
                self.orchestrator.config().model,
                self.orchestrator.tools().len()
            ))
        );
        println!(
            "{}",
            dim.apply_to("Type your message and press Enter. Type exit or press Ctrl+D to quit.")
        );
        println!();
    }
}

/// Print one dim line per tool call in the report.
pub fn print_report(report: &TurnReport) {
    for call in &report.calls {
        let status = match &call.outcome {
            CallOutcome::Completed(_) => "done".to_string(),
            CallOutcome::ToolFailed(message) => format!("failed: {}", message),
            CallOutcome::InvalidArguments(message) => format!("not run: {}", message),
        };
        print_dim(&format!("[{} {}: {}]", call.name, call.id, status));
    }
}

fn print_dim(msg: &str) {
    let dim = Style::new().dim();
    println!("{}", dim.apply_to(msg));
}

fn print_error(msg: &str) {
    let red = Style::new().red();
    println!("{} {}", red.apply_to("Error:"), msg);
}

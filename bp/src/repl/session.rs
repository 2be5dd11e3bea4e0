//! REPL session management

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::llm::TokenUsage;
use crate::planner::{Orchestrator, OrchestratorError, QueryResult, RequestContext};

/// Interactive REPL session
pub struct ReplSession {
    orchestrator: Arc<Orchestrator>,
    has_store: bool,
    show_trace: bool,
    usage: TokenUsage,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(orchestrator: Arc<Orchestrator>, has_store: bool) -> Self {
        Self {
            orchestrator,
            has_store,
            show_trace: false,
            usage: TokenUsage::default(),
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input) {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Budget Planner Chat".bright_cyan().bold());
        println!("Model: {}", self.orchestrator.model());
        if !self.has_store {
            println!(
                "{}",
                "No ledger database configured; run `bp db init` or set store.path.".yellow()
            );
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Handle slash commands
    pub fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        debug!(%cmd, "handle_slash_command: called");

        match cmd {
            "/help" | "/h" => {
                self.print_help();
                SlashResult::Continue
            }
            "/quit" | "/q" | "/exit" => SlashResult::Quit,
            "/trace" | "/t" => {
                self.show_trace = !self.show_trace;
                let state = if self.show_trace { "on" } else { "off" };
                println!("{}", format!("Trace {}.", state).dimmed());
                SlashResult::Continue
            }
            "/usage" => {
                self.print_usage();
                SlashResult::Continue
            }
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
                SlashResult::Continue
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the REPL", "/quit".yellow());
        println!("  {:14} Toggle printing states and queries", "/trace".yellow());
        println!("  {:14} Show token usage for this session", "/usage".yellow());
        println!();
        println!("{}", "Try:".bright_cyan());
        println!("  How much did I spend on food this month?");
        println!("  I spent $45.99 at Chipotle for lunch");
        println!("  Create a goal to save $2000 for a vacation by June");
        println!();
    }

    fn print_usage(&self) {
        let cost = self.usage.cost_usd(self.orchestrator.model());
        println!(
            "{}",
            format!(
                "{} input / {} output tokens (~${:.4})",
                self.usage.input_tokens, self.usage.output_tokens, cost
            )
            .dimmed()
        );
    }

    /// Answer one message; Ctrl+C while waiting cancels just this request
    async fn process_user_input(&mut self, input: &str) {
        match self.orchestrator.handle_with_context_until(input, super::interrupted()).await {
            Ok(ctx) => {
                self.usage.add(&ctx.usage);
                if self.show_trace {
                    print_trace(&ctx);
                }
                println!("{}", ctx.response.as_deref().unwrap_or_default());
            }
            Err(OrchestratorError::Cancelled) => println!("{}", "Request cancelled.".yellow()),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        println!();
    }
}

/// Print the states a request visited and the last query it ran
fn print_trace(ctx: &RequestContext) {
    let states: Vec<&str> = ctx.trace.iter().map(|s| s.name()).collect();
    println!("{} {}", "states:".dimmed(), states.join(" -> ").dimmed());
    if ctx.refinements > 0 || ctx.cap_exceeded {
        println!(
            "{} {}{}",
            "refinements:".dimmed(),
            ctx.refinements,
            if ctx.cap_exceeded { " (limit reached)" } else { "" }
        );
    }
    for ambiguity in &ctx.ambiguities {
        println!(
            "{} {} {:?} -> {}",
            "ambiguous:".yellow(),
            ambiguity.decision,
            ambiguity.raw,
            ambiguity.resolved
        );
    }
    if let Some(query) = &ctx.query {
        println!("{} {}", "query:".dimmed(), query.text.bright_white());
        match &query.result {
            Some(QueryResult::Rows(rows)) => println!("{} {} row(s)", "result:".dimmed(), rows.len()),
            Some(QueryResult::Affected(n)) => println!("{} {} row(s) affected", "result:".dimmed(), n),
            Some(QueryResult::Failed(e)) => println!("{} {}", "result:".red(), e),
            None => {}
        }
    }
}

/// Result of handling a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum SlashResult {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;

    fn session() -> ReplSession {
        let llm = Arc::new(MockLlmClient::new(vec![]));
        let orchestrator = Orchestrator::new(llm, None, PromptLoader::embedded_only(), PlannerConfig::default());
        ReplSession::new(Arc::new(orchestrator), false)
    }

    #[test]
    fn test_quit_commands() {
        let mut session = session();
        assert_eq!(session.handle_slash_command("/quit"), SlashResult::Quit);
        assert_eq!(session.handle_slash_command("/q"), SlashResult::Quit);
        assert_eq!(session.handle_slash_command("/exit"), SlashResult::Quit);
    }

    #[test]
    fn test_trace_toggles() {
        let mut session = session();
        assert!(!session.show_trace);
        assert_eq!(session.handle_slash_command("/trace"), SlashResult::Continue);
        assert!(session.show_trace);
        session.handle_slash_command("/t");
        assert!(!session.show_trace);
    }

    #[test]
    fn test_unknown_command_continues() {
        let mut session = session();
        assert_eq!(session.handle_slash_command("/frobnicate"), SlashResult::Continue);
    }
}

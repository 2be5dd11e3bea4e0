//! CLI command definitions and subcommands

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// bp - budget planner chat assistant
#[derive(Parser)]
#[command(
    name = "bp",
    about = "Chat with your budget: questions and changes in plain language",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Raise log verbosity (-v DEBUG, -vv TRACE)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Effective CLI log level: an explicit `--log-level` wins over `-v`
    pub fn effective_log_level(&self) -> Option<String> {
        if self.log_level.is_some() {
            return self.log_level.clone();
        }
        match self.verbose {
            0 => None,
            1 => Some("DEBUG".to_string()),
            _ => Some("TRACE".to_string()),
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one message and print the answer
    Chat {
        /// The message, e.g. "How much did I spend on food?"
        message: String,

        /// Print the visited states and generated query
        #[arg(short, long)]
        trace: bool,
    },

    /// Interactive chat session
    Repl,

    /// Manage the ledger database
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

/// Ledger database subcommands
#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create the schema (safe to re-run)
    Init,

    /// Insert a demo user with expenses, budgets and goals
    Seed,

    /// Show row counts per table
    Stats {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Result of checking whether an API key variable is set
pub struct KeyCheck {
    pub name: &'static str,
    pub present: bool,
}

impl KeyCheck {
    pub fn check(name: &'static str) -> Self {
        let present = std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);
        debug!(name, present, "KeyCheck::check: called");
        Self { name, present }
    }
}

/// Check the API key variables of the supported providers
pub fn check_api_keys() -> Vec<KeyCheck> {
    vec![KeyCheck::check("OPENAI_API_KEY"), KeyCheck::check("ANTHROPIC_API_KEY")]
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("budgetplanner")
        .join("logs")
        .join("budgetplanner.log")
}

/// Generate the after_help text with API key and log file status
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("API Keys:\n");
    for key in check_api_keys() {
        let icon = if key.present { "\u{2705}" } else { "\u{274C}" };
        let status = if key.present { "set" } else { "not set" };
        help.push_str(&format!("  {} {:<18} {}\n", icon, key.name, status));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

/// Output format for the stats command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

//! bp - budget planner chat assistant
//!
//! CLI entry point: one-shot chat, interactive REPL and ledger maintenance.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use budgetplanner::cli::{Cli, Command, DbCommand, OutputFormat, generate_after_help, get_log_path};
use budgetplanner::config::Config;
use budgetplanner::llm::create_client;
use budgetplanner::planner::{Orchestrator, OrchestratorError, QueryResult, RequestContext};
use budgetplanner::prompts::PromptLoader;
use budgetplanner::repl;
use budgetplanner::store::{DataStore, SqliteStore};
use ledgerstore::Ledger;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level / -v > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dynamic after_help shows API key status and the log location
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    let cli_log_level = cli.effective_log_level();
    setup_logging(cli_log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model(), "bp loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Chat { message, trace }) => {
            debug!(trace, "main: matched Chat command");
            cmd_chat(&config, &message, trace).await
        }
        Some(Command::Repl) | None => {
            debug!("main: launching REPL");
            cmd_repl(&config).await
        }
        Some(Command::Db { command }) => match command {
            DbCommand::Init => cmd_db_init(&config),
            DbCommand::Seed => cmd_db_seed(&config),
            DbCommand::Stats { format } => cmd_db_stats(&config, format),
        },
    }
}

/// Wire the orchestrator from config
///
/// The store is optional: without a database the chat still answers, and
/// any query it attempts fails with "not configured".
fn build_orchestrator(config: &Config) -> Result<(Orchestrator, bool)> {
    debug!("build_orchestrator: called");
    config.validate()?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let store: Option<Arc<dyn DataStore>> = match config.store.chat_path() {
        Some(path) => {
            let ledger = Ledger::open(&path).context(format!("Failed to open ledger at {}", path.display()))?;
            Some(Arc::new(SqliteStore::new(ledger, config.planner.query_guard)))
        }
        None => {
            warn!("No ledger database configured; queries will fail");
            None
        }
    };
    let has_store = store.is_some();

    let prompts = PromptLoader::new(config.planner.prompts_dir.as_deref());
    let orchestrator = Orchestrator::new(llm, store, prompts, config.planner.clone())
        .with_user_id(config.store.user_id)
        .with_max_tokens(config.llm.max_tokens);
    Ok((orchestrator, has_store))
}

/// Answer one message and exit
async fn cmd_chat(config: &Config, message: &str, trace: bool) -> Result<()> {
    debug!(message_len = message.len(), trace, "cmd_chat: called");
    let (orchestrator, _) = build_orchestrator(config)?;

    match orchestrator.handle_with_context_until(message, repl::interrupted()).await {
        Ok(ctx) => {
            if trace {
                print_trace(&ctx);
            }
            println!("{}", ctx.response.as_deref().unwrap_or_default());
            Ok(())
        }
        Err(OrchestratorError::Cancelled) => {
            eprintln!("{}", "Request cancelled.".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_trace(ctx: &RequestContext) {
    let states: Vec<&str> = ctx.trace.iter().map(|s| s.name()).collect();
    eprintln!("{} {}", "states:".dimmed(), states.join(" -> "));
    if let Some(query) = &ctx.query {
        eprintln!("{} {}", "query:".dimmed(), query.text);
        if let Some(QueryResult::Failed(e)) = &query.result {
            eprintln!("{} {}", "error:".red(), e);
        }
    }
    if ctx.cap_exceeded {
        eprintln!("{} refinement limit reached", "note:".yellow());
    }
}

async fn cmd_repl(config: &Config) -> Result<()> {
    debug!("cmd_repl: called");
    let (orchestrator, has_store) = build_orchestrator(config)?;
    repl::run_interactive(Arc::new(orchestrator), has_store).await
}

fn ledger_path(config: &Config) -> PathBuf {
    config.store.path_or_default()
}

fn cmd_db_init(config: &Config) -> Result<()> {
    let path = ledger_path(config);
    debug!(?path, "cmd_db_init: called");
    let ledger = Ledger::open(&path)?;
    ledger.init_schema()?;
    println!("Initialized ledger at {}", path.display());
    Ok(())
}

fn cmd_db_seed(config: &Config) -> Result<()> {
    let path = ledger_path(config);
    debug!(?path, "cmd_db_seed: called");
    let ledger = Ledger::open(&path)?;
    ledger.init_schema()?;
    let report = ledger.seed_demo()?;
    println!(
        "Seeded user {}: {} expenses, {} budgets, {} goals",
        report.user_id, report.expenses, report.budgets, report.goals
    );
    Ok(())
}

fn cmd_db_stats(config: &Config, format: OutputFormat) -> Result<()> {
    let path = ledger_path(config);
    debug!(?path, %format, "cmd_db_stats: called");
    if !path.exists() {
        return Err(eyre::eyre!(
            "No ledger at {}. Run `bp db init` first.",
            path.display()
        ));
    }
    let counts = Ledger::open(&path)?.table_counts()?;

    match format {
        OutputFormat::Json => {
            let tables: serde_json::Map<String, serde_json::Value> = counts
                .counts
                .iter()
                .map(|(table, n)| (table.clone(), serde_json::Value::from(*n)))
                .collect();
            let out = serde_json::json!({
                "path": path.display().to_string(),
                "tables": tables,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", path.display().to_string().bold());
            for (table, n) in &counts.counts {
                println!("  {:<10} {}", table, n);
            }
        }
    }
    Ok(())
}

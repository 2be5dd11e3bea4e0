//! Interactive REPL for budgetplanner
//!
//! Reads messages with rustyline, answers each through the orchestrator,
//! and handles a few slash commands.

mod session;

pub use session::{ReplSession, SlashResult};

use std::future::Future;
use std::sync::Arc;

use eyre::Result;
use tracing::warn;

use crate::planner::Orchestrator;

/// Run the interactive REPL
///
/// This is the main entry point for `bp repl`.
pub async fn run_interactive(orchestrator: Arc<Orchestrator>, has_store: bool) -> Result<()> {
    let mut session = ReplSession::new(orchestrator, has_store);
    session.run().await
}

/// Completes on Ctrl+C; never completes if the handler cannot be installed
pub async fn interrupted() {
    cancel_on(tokio::signal::ctrl_c()).await
}

/// Resolve when `signal` fires, or stay pending forever when it errors
async fn cancel_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "cancel_on: could not listen for Ctrl+C, requests cannot be cancelled");
        std::future::pending::<()>().await;
    }
}

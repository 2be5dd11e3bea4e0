//! Budget Planner - chat with a personal budget ledger
//!
//! A user message is classified as a read or a write, turned into one SQL
//! statement against the ledger, executed, and answered in plain language.
//! Reads may refine their own prompt a bounded number of times before
//! answering.
//!
//! # Modules
//!
//! - [`planner`] - Orchestrator state machine and label parsing
//! - [`llm`] - LLM client trait with Anthropic and OpenAI implementations
//! - [`store`] - Data store trait, statement guard and SQLite store
//! - [`prompts`] - Handlebars prompt templates with user overrides
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`repl`] - Interactive chat session

pub mod cli;
pub mod config;
pub mod llm;
pub mod planner;
pub mod prompts;
pub mod repl;
pub mod store;

// Re-export commonly used types
pub use config::{Config, LlmConfig, PlannerConfig, QueryGuard, StoreConfig};
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client,
};
pub use planner::{Orchestrator, OrchestratorError, RequestContext, State};
pub use store::{DataStore, QueryMode, QueryOutcome, SqliteStore, StoreError};

//! Budget chat query orchestrator
//!
//! Turns one free-text message into a short sequence of LLM decisions, at
//! most one generated query per pass, and a final natural-language answer:
//!
//! ```text
//! ClassifyRequestKind -> DecideNeedsData -> SynthesizeQuery -> ExecuteQuery -> DecideRefine -> Respond
//!                     \-> ClassifyWriteKind -/                              \-> Respond       \-> RegeneratePrompt -> (loop)
//! ```
//!
//! The refine loop is bounded by `planner.max-refinements`.

pub mod classify;
mod context;
mod error;
mod orchestrator;
mod state;

pub use classify::ClassificationAmbiguous;
pub use context::{Ambiguity, Intent, QueryResult, RequestContext, SynthesizedQuery, WriteKind};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use state::{State, next, step_limit};

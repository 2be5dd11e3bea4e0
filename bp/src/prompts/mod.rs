//! Prompt Template System
//!
//! Loads and renders the `.pmt` templates behind every orchestrator step.
//!
//! Template loading chain:
//! 1. `{planner.prompts-dir}/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader, QueryTask, Template};

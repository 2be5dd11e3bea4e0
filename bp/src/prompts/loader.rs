//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use ledgerstore::{ExpenseCategory, InputType};
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Every template the orchestrator renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    System,
    ClassifyRequest,
    NeedsData,
    ClassifyWrite,
    SynthesizeQuery,
    DecideRefine,
    RegeneratePrompt,
    RespondRead,
    RespondWrite,
}

impl Template {
    pub const ALL: [Template; 9] = [
        Self::System,
        Self::ClassifyRequest,
        Self::NeedsData,
        Self::ClassifyWrite,
        Self::SynthesizeQuery,
        Self::DecideRefine,
        Self::RegeneratePrompt,
        Self::RespondRead,
        Self::RespondWrite,
    ];

    /// File stem of the template (`{name}.pmt`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::ClassifyRequest => "classify-request",
            Self::NeedsData => "needs-data",
            Self::ClassifyWrite => "classify-write",
            Self::SynthesizeQuery => "synthesize-query",
            Self::DecideRefine => "decide-refine",
            Self::RegeneratePrompt => "regenerate-prompt",
            Self::RespondRead => "respond-read",
            Self::RespondWrite => "respond-write",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which query instructions `synthesize-query` renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTask {
    Read,
    AdjustBudget,
    NewExpense,
    CreateGoal,
}

/// Context for rendering prompt templates
///
/// One flat struct serves every template; fields a template does not use
/// are simply ignored by it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    /// Current instruction (the user message, or a regenerated prompt)
    pub prompt: String,
    /// User the generated SQL is scoped to
    pub user_id: i64,
    /// Local date, `YYYY-MM-DD`
    pub today: String,
    /// Table listing, one `- table (columns)` line per table
    pub schema: String,
    /// Comma-separated expense categories
    pub categories: String,
    /// Comma-separated expense input types
    pub input_types: String,

    pub is_read: bool,
    pub is_adjust_budget: bool,
    pub is_new_expense: bool,
    pub is_create_goal: bool,

    /// Whether a query was synthesized for this pass
    pub has_query: bool,
    pub query: Option<String>,
    /// Row preview of a read result
    pub data: Option<String>,
    /// Affected row count of a write
    pub affected: Option<u64>,
    /// Store error message, when the query failed
    pub error: Option<String>,
    /// The refine loop was stopped by the iteration cap
    pub cap_exceeded: bool,
}

impl PromptContext {
    /// Base context for an instruction, with schema and vocabularies filled in
    pub fn new(prompt: impl Into<String>, user_id: i64) -> Self {
        let prompt = prompt.into();
        debug!(prompt_len = prompt.len(), %user_id, "PromptContext::new: called");
        Self {
            prompt,
            user_id,
            today: chrono::Local::now().format("%Y-%m-%d").to_string(),
            schema: ledgerstore::schema::describe(),
            categories: ExpenseCategory::ALL.map(|c| c.as_str()).join(", "),
            input_types: InputType::ALL.map(|t| t.as_str()).join(", "),
            ..Self::default()
        }
    }

    /// Select the query instructions for `synthesize-query`
    pub fn with_task(mut self, task: QueryTask) -> Self {
        self.is_read = task == QueryTask::Read;
        self.is_adjust_budget = task == QueryTask::AdjustBudget;
        self.is_new_expense = task == QueryTask::NewExpense;
        self.is_create_goal = task == QueryTask::CreateGoal;
        self
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `prompts_dir` before the embedded defaults
    pub fn new(prompts_dir: Option<&Path>) -> Self {
        debug!(?prompts_dir, "PromptLoader::new: called");
        let user_dir = prompts_dir.filter(|dir| dir.exists()).map(Path::to_path_buf);
        if prompts_dir.is_some() && user_dir.is_none() {
            debug!("PromptLoader::new: override directory missing, using embedded prompts");
        }

        Self {
            hbs: Self::engine(),
            user_dir,
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    // Prompts are plain text; HTML escaping would mangle quotes in SQL and JSON.
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{prompts_dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template: Template, context: &PromptContext) -> Result<String> {
        debug!(%template, "PromptLoader::render: called");
        let source = self.load_template(template.name())?;
        self.hbs
            .render_template(&source, context)
            .map(|text| text.trim().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template, e))
    }
}

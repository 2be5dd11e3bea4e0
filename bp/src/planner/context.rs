//! Per-request state carried through the orchestrator

use ledgerstore::Row;
use serde_json::Value;
use uuid::Uuid;

use super::state::State;
use crate::llm::TokenUsage;
use crate::store::{QueryMode, QueryOutcome, StoreError};

/// Kind of change a write request makes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    AdjustBudget,
    NewExpense,
    CreateGoal,
}

/// What the current pass decided the user wants
///
/// Read-only decisions live on `Read`, the write subtype on `Write`, so a
/// context can never carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Read {
        needs_data: Option<bool>,
        should_refine: Option<bool>,
    },
    Write {
        kind: Option<WriteKind>,
    },
}

impl Intent {
    pub fn read() -> Self {
        Intent::Read {
            needs_data: None,
            should_refine: None,
        }
    }

    pub fn write() -> Self {
        Intent::Write { kind: None }
    }

    pub fn mode(&self) -> QueryMode {
        match self {
            Intent::Read { .. } => QueryMode::Read,
            Intent::Write { .. } => QueryMode::Write,
        }
    }
}

/// Outcome of executing a synthesized query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows(Vec<Row>),
    Affected(u64),
    Failed(StoreError),
}

impl From<Result<QueryOutcome, StoreError>> for QueryResult {
    fn from(result: Result<QueryOutcome, StoreError>) -> Self {
        match result {
            Ok(QueryOutcome::Rows(rows)) => QueryResult::Rows(rows),
            Ok(QueryOutcome::Affected(n)) => QueryResult::Affected(n),
            Err(e) => QueryResult::Failed(e),
        }
    }
}

impl QueryResult {
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            QueryResult::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Text form of the result for prompts, one JSON object per row
    pub fn preview(&self, max_rows: usize) -> String {
        match self {
            QueryResult::Rows(rows) if rows.is_empty() => "(no rows)".to_string(),
            QueryResult::Rows(rows) => {
                let mut lines: Vec<String> = rows
                    .iter()
                    .take(max_rows)
                    .map(|row| Value::Object(row.clone()).to_string())
                    .collect();
                if rows.len() > max_rows {
                    lines.push(format!("... {} more rows not shown", rows.len() - max_rows));
                }
                lines.join("\n")
            }
            QueryResult::Affected(n) => format!("{} row(s) affected", n),
            QueryResult::Failed(e) => e.to_string(),
        }
    }
}

/// A query produced by the model, and what running it returned
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedQuery {
    pub text: String,
    pub mode: QueryMode,
    pub result: Option<QueryResult>,
}

/// A classification whose answer matched no label and fell back to a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub decision: &'static str,
    pub raw: String,
    pub resolved: String,
}

/// Everything one `handle` call knows about its message
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for logs
    pub id: Uuid,
    /// The message as the user sent it
    pub message: String,
    /// Current instruction; replaced on every refine pass
    pub prompt: String,
    pub intent: Option<Intent>,
    pub query: Option<SynthesizedQuery>,
    pub response: Option<String>,
    pub refinements: u32,
    pub cap_exceeded: bool,
    pub ambiguities: Vec<Ambiguity>,
    /// States visited, in order
    pub trace: Vec<State>,
    pub usage: TokenUsage,
}

impl RequestContext {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: Uuid::now_v7(),
            prompt: message.clone(),
            message,
            intent: None,
            query: None,
            response: None,
            refinements: 0,
            cap_exceeded: false,
            ambiguities: Vec::new(),
            trace: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self.intent, Some(Intent::Read { .. }))
    }

    pub fn needs_data(&self) -> Option<bool> {
        match self.intent {
            Some(Intent::Read { needs_data, .. }) => needs_data,
            _ => None,
        }
    }

    pub fn should_refine(&self) -> Option<bool> {
        match self.intent {
            Some(Intent::Read { should_refine, .. }) => should_refine,
            _ => None,
        }
    }

    pub fn write_kind(&self) -> Option<WriteKind> {
        match self.intent {
            Some(Intent::Write { kind }) => kind,
            _ => None,
        }
    }

    pub fn query_result(&self) -> Option<&QueryResult> {
        self.query.as_ref().and_then(|q| q.result.as_ref())
    }

    /// Start a refine pass with a regenerated prompt
    ///
    /// The new prompt already carries what the last query returned, so the
    /// previous decisions and query are dropped.
    pub fn begin_pass(&mut self, prompt: String) {
        self.prompt = prompt;
        self.intent = None;
        self.query = None;
        self.refinements += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(json: &str) -> Row {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_accessors_follow_intent() {
        let mut ctx = RequestContext::new("hi");
        assert_eq!(ctx.needs_data(), None);

        ctx.intent = Some(Intent::Read {
            needs_data: Some(true),
            should_refine: None,
        });
        assert!(ctx.is_read());
        assert_eq!(ctx.needs_data(), Some(true));
        assert_eq!(ctx.write_kind(), None);

        ctx.intent = Some(Intent::Write {
            kind: Some(WriteKind::NewExpense),
        });
        assert_eq!(ctx.needs_data(), None);
        assert_eq!(ctx.write_kind(), Some(WriteKind::NewExpense));
    }

    #[test]
    fn test_begin_pass_clears_decisions() {
        let mut ctx = RequestContext::new("original");
        ctx.intent = Some(Intent::read());
        ctx.query = Some(SynthesizedQuery {
            text: "SELECT 1".to_string(),
            mode: QueryMode::Read,
            result: Some(QueryResult::Affected(0)),
        });

        ctx.begin_pass("refined".to_string());

        assert_eq!(ctx.prompt, "refined");
        assert_eq!(ctx.message, "original");
        assert!(ctx.intent.is_none());
        assert!(ctx.query.is_none());
        assert_eq!(ctx.refinements, 1);
    }

    #[test]
    fn test_preview_truncates_rows() {
        let rows = vec![row(r#"{"a":1}"#), row(r#"{"a":2}"#), row(r#"{"a":3}"#)];
        let text = QueryResult::Rows(rows).preview(2);
        assert_eq!(text, "{\"a\":1}\n{\"a\":2}\n... 1 more rows not shown");
    }

    #[test]
    fn test_preview_other_results() {
        assert_eq!(QueryResult::Rows(vec![]).preview(10), "(no rows)");
        assert_eq!(QueryResult::Affected(1).preview(10), "1 row(s) affected");
        assert_eq!(
            QueryResult::Failed(StoreError::NotConfigured).preview(10),
            "Database connection not configured"
        );
    }

    #[test]
    fn test_result_from_store_outcome() {
        let result: QueryResult = Err(StoreError::Sql("boom".to_string())).into();
        assert_eq!(result.error(), Some(&StoreError::Sql("boom".to_string())));
        let result: QueryResult = Ok(QueryOutcome::Affected(2)).into();
        assert_eq!(result, QueryResult::Affected(2));
    }
}

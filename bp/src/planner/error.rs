//! Orchestrator error types

use std::time::Duration;

use thiserror::Error;

use super::state::State;
use crate::llm::LlmError;

/// Errors that end a `handle` call without a response
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("LLM call failed during {stage}: {source}")]
    Llm {
        stage: State,
        #[source]
        source: LlmError,
    },

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: State, after: Duration },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Failed to render prompt: {0}")]
    Prompt(String),

    #[error("Orchestrator exceeded {limit} steps without responding")]
    StepBudget { limit: usize },
}

impl OrchestratorError {
    /// Map an LLM failure, folding provider timeouts into [`OrchestratorError::Timeout`]
    pub fn from_llm(stage: State, source: LlmError, after: Duration) -> Self {
        if source.is_timeout() {
            return OrchestratorError::Timeout { stage, after };
        }
        OrchestratorError::Llm { stage, source }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, OrchestratorError::Timeout { .. })
    }
}

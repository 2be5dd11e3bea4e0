//! Orchestrator - drives one message through the state machine

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::classify::{Label, RefineChoice, RequestKind, YesNo, parse_label};
use super::context::{Ambiguity, Intent, QueryResult, RequestContext, SynthesizedQuery, WriteKind};
use super::error::OrchestratorError;
use super::state::{State, next, step_limit};
use crate::config::PlannerConfig;
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, StopReason};
use crate::prompts::{PromptContext, PromptLoader, QueryTask, Template};
use crate::store::{DataStore, QueryMode, StoreError, strip_wrapping};

/// Default response budget when the LLM config does not set one
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Budget chat orchestrator
///
/// Holds only shared collaborators; every `handle` call owns its own
/// [`RequestContext`], so one orchestrator can serve concurrent messages.
pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    store: Option<Arc<dyn DataStore>>,
    prompts: PromptLoader,
    config: PlannerConfig,
    user_id: i64,
    max_tokens: u32,
}

impl Orchestrator {
    /// Create an orchestrator; `store: None` runs without a database
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Option<Arc<dyn DataStore>>,
        prompts: PromptLoader,
        config: PlannerConfig,
    ) -> Self {
        debug!(model = %llm.model(), has_store = store.is_some(), max_refinements = config.max_refinements, "Orchestrator::new: called");
        Self {
            llm,
            store,
            prompts,
            config,
            user_id: 1,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Scope generated queries to this user
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Answer one user message
    pub async fn handle(&self, message: &str) -> Result<String, OrchestratorError> {
        let ctx = self.handle_with_context(message).await?;
        Ok(ctx.response.unwrap_or_default())
    }

    /// Answer one user message, aborting with [`OrchestratorError::Cancelled`]
    /// as soon as `cancel` completes
    pub async fn handle_until<C>(&self, message: &str, cancel: C) -> Result<String, OrchestratorError>
    where
        C: Future<Output = ()>,
    {
        let ctx = self.handle_with_context_until(message, cancel).await?;
        Ok(ctx.response.unwrap_or_default())
    }

    /// Cancellable [`Orchestrator::handle_with_context`]
    pub async fn handle_with_context_until<C>(&self, message: &str, cancel: C) -> Result<RequestContext, OrchestratorError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                info!("handle_with_context_until: cancelled");
                Err(OrchestratorError::Cancelled)
            }
            result = self.handle_with_context(message) => result,
        }
    }

    /// Answer one user message and return the full request context
    pub async fn handle_with_context(&self, message: &str) -> Result<RequestContext, OrchestratorError> {
        let mut ctx = RequestContext::new(message);
        debug!(request_id = %ctx.id, message_len = message.len(), "handle_with_context: called");

        let limit = step_limit(self.config.max_refinements);
        let mut state = State::INITIAL;
        for _ in 0..limit {
            ctx.trace.push(state);
            self.run_state(state, &mut ctx).await?;

            match next(state, &ctx) {
                Some(to) => {
                    info!(request_id = %ctx.id, from = %state, %to, "transition");
                    state = to;
                }
                None => {
                    info!(request_id = %ctx.id, steps = ctx.trace.len(), refinements = ctx.refinements, "request complete");
                    return Ok(ctx);
                }
            }
        }

        error!(request_id = %ctx.id, limit, "handle_with_context: step budget exhausted");
        Err(OrchestratorError::StepBudget { limit })
    }

    async fn run_state(&self, state: State, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        match state {
            State::ClassifyRequestKind => self.classify_request_kind(ctx).await,
            State::DecideNeedsData => self.decide_needs_data(ctx).await,
            State::ClassifyWriteKind => self.classify_write_kind(ctx).await,
            State::SynthesizeQuery => self.synthesize_query(ctx).await,
            State::ExecuteQuery => self.execute_query(ctx).await,
            State::DecideRefine => self.decide_refine(ctx).await,
            State::RegeneratePrompt => self.regenerate_prompt(ctx).await,
            State::Respond => self.respond(ctx).await,
        }
    }

    async fn classify_request_kind(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let pctx = self.prompt_context(ctx);
        let reply = self.ask(ctx, State::ClassifyRequestKind, Template::ClassifyRequest, pctx).await?;
        let kind: RequestKind = resolve(ctx, &reply);
        ctx.intent = Some(match kind {
            RequestKind::Read => Intent::read(),
            RequestKind::Write => Intent::write(),
        });
        Ok(())
    }

    async fn decide_needs_data(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let pctx = self.prompt_context(ctx);
        let reply = self.ask(ctx, State::DecideNeedsData, Template::NeedsData, pctx).await?;
        let answer: YesNo = resolve(ctx, &reply);
        if let Some(Intent::Read { needs_data, .. }) = ctx.intent.as_mut() {
            *needs_data = Some(answer == YesNo::Yes);
        }
        Ok(())
    }

    async fn classify_write_kind(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let pctx = self.prompt_context(ctx);
        let reply = self.ask(ctx, State::ClassifyWriteKind, Template::ClassifyWrite, pctx).await?;
        let kind: WriteKind = resolve(ctx, &reply);
        ctx.intent = Some(Intent::Write { kind: Some(kind) });
        Ok(())
    }

    async fn synthesize_query(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let (task, mode) = match &ctx.intent {
            Some(Intent::Write { kind }) => {
                let task = match kind.unwrap_or(WriteKind::DEFAULT) {
                    WriteKind::AdjustBudget => QueryTask::AdjustBudget,
                    WriteKind::NewExpense => QueryTask::NewExpense,
                    WriteKind::CreateGoal => QueryTask::CreateGoal,
                };
                (task, QueryMode::Write)
            }
            _ => (QueryTask::Read, QueryMode::Read),
        };

        let pctx = self.prompt_context(ctx).with_task(task);
        let response = self
            .ask_response(ctx, State::SynthesizeQuery, Template::SynthesizeQuery, pctx)
            .await?;
        let text = strip_wrapping(response.text_or_empty());
        info!(request_id = %ctx.id, ?task, query = %text, "synthesized query");

        // A statement cut off at the token limit is never run
        let result = (response.stop_reason == StopReason::MaxTokens).then(|| {
            warn!(request_id = %ctx.id, "synthesize_query: reply hit the token limit, query is truncated");
            QueryResult::Failed(StoreError::Rejected(
                "the generated query was cut off at the response token limit".to_string(),
            ))
        });

        ctx.query = Some(SynthesizedQuery { text, mode, result });
        Ok(())
    }

    async fn execute_query(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let Some(query) = ctx.query.as_mut() else {
            warn!(request_id = %ctx.id, "execute_query: no query to run");
            return Ok(());
        };
        if query.result.is_some() {
            debug!(request_id = %ctx.id, "execute_query: query already settled, not running it");
            return Ok(());
        }

        let result = match &self.store {
            None => QueryResult::Failed(StoreError::NotConfigured),
            Some(store) => {
                let after = self.config.store_timeout();
                match tokio::time::timeout(after, store.execute(&query.text, query.mode)).await {
                    Ok(outcome) => QueryResult::from(outcome),
                    Err(_) => {
                        return Err(OrchestratorError::Timeout {
                            stage: State::ExecuteQuery,
                            after,
                        });
                    }
                }
            }
        };

        match &result {
            QueryResult::Rows(rows) => info!(request_id = %ctx.id, row_count = rows.len(), "query returned rows"),
            QueryResult::Affected(n) => info!(request_id = %ctx.id, affected = n, "query committed"),
            QueryResult::Failed(e) => error!(request_id = %ctx.id, error = %e, "query failed"),
        }
        query.result = Some(result);
        Ok(())
    }

    async fn decide_refine(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let pctx = self.prompt_context(ctx);
        let reply = self.ask(ctx, State::DecideRefine, Template::DecideRefine, pctx).await?;
        let choice: RefineChoice = resolve(ctx, &reply);
        if let Some(Intent::Read { should_refine, .. }) = ctx.intent.as_mut() {
            *should_refine = Some(choice == RefineChoice::Refine);
        }
        Ok(())
    }

    async fn regenerate_prompt(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        if ctx.refinements >= self.config.max_refinements {
            warn!(request_id = %ctx.id, refinements = ctx.refinements, "refine limit reached, responding with current data");
            ctx.cap_exceeded = true;
            return Ok(());
        }

        let pctx = self.prompt_context(ctx);
        let reply = self.ask(ctx, State::RegeneratePrompt, Template::RegeneratePrompt, pctx).await?;
        let prompt = if reply.is_empty() { ctx.prompt.clone() } else { reply };
        ctx.begin_pass(prompt);
        debug!(request_id = %ctx.id, refinements = ctx.refinements, "regenerate_prompt: new pass");
        Ok(())
    }

    async fn respond(&self, ctx: &mut RequestContext) -> Result<(), OrchestratorError> {
        let template = match ctx.intent {
            Some(Intent::Write { .. }) => Template::RespondWrite,
            _ => Template::RespondRead,
        };
        let pctx = self.prompt_context(ctx);
        let reply = self.ask(ctx, State::Respond, template, pctx).await?;

        let response = if reply.is_empty() {
            warn!(request_id = %ctx.id, "respond: model returned no text");
            match ctx.query_result().and_then(QueryResult::error) {
                Some(e) => format!("Sorry, I couldn't complete that request: {}", e),
                None => "Sorry, I couldn't come up with an answer to that.".to_string(),
            }
        } else {
            reply
        };
        ctx.response = Some(response);
        Ok(())
    }

    /// Template context for the current pass
    fn prompt_context(&self, ctx: &RequestContext) -> PromptContext {
        let mut pctx = PromptContext::new(ctx.prompt.clone(), self.user_id);
        pctx.cap_exceeded = ctx.cap_exceeded;
        if let Some(query) = &ctx.query {
            pctx.has_query = true;
            pctx.query = Some(query.text.clone());
            match &query.result {
                Some(QueryResult::Failed(e)) => pctx.error = Some(e.to_string()),
                Some(result @ QueryResult::Rows(_)) => pctx.data = Some(result.preview(self.config.max_prompt_rows)),
                Some(QueryResult::Affected(n)) => {
                    pctx.affected = Some(*n);
                    pctx.data = Some(QueryResult::Affected(*n).preview(self.config.max_prompt_rows));
                }
                None => {}
            }
        }
        pctx
    }

    /// Render a template, send it, and return the trimmed reply
    async fn ask(
        &self,
        ctx: &mut RequestContext,
        stage: State,
        template: Template,
        pctx: PromptContext,
    ) -> Result<String, OrchestratorError> {
        let response = self.ask_response(ctx, stage, template, pctx).await?;
        Ok(response.text_or_empty().to_string())
    }

    /// Like [`Orchestrator::ask`], keeping the stop reason
    async fn ask_response(
        &self,
        ctx: &mut RequestContext,
        stage: State,
        template: Template,
        pctx: PromptContext,
    ) -> Result<CompletionResponse, OrchestratorError> {
        debug!(request_id = %ctx.id, %stage, %template, "ask: called");
        let render = |t: Template| {
            self.prompts
                .render(t, &pctx)
                .map_err(|e| OrchestratorError::Prompt(e.to_string()))
        };
        let request = CompletionRequest::single(render(Template::System)?, render(template)?, self.max_tokens);

        let after = self.config.llm_timeout();
        let response = match tokio::time::timeout(after, self.llm.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(request_id = %ctx.id, %stage, error = %e, "ask: LLM call failed");
                return Err(OrchestratorError::from_llm(stage, e, after));
            }
            Err(_) => {
                error!(request_id = %ctx.id, %stage, ?after, "ask: LLM call timed out");
                return Err(OrchestratorError::Timeout { stage, after });
            }
        };

        ctx.usage.add(&response.usage);
        Ok(response)
    }
}

/// Parse a classification reply, recording and defaulting when it is ambiguous
fn resolve<L: Label>(ctx: &mut RequestContext, reply: &str) -> L {
    match parse_label::<L>(reply) {
        Ok(value) => {
            debug!(request_id = %ctx.id, decision = L::DECISION, label = value.label(), "resolve: matched");
            value
        }
        Err(ambiguous) => {
            warn!(
                request_id = %ctx.id,
                decision = ambiguous.decision,
                raw = %ambiguous.raw,
                default = L::DEFAULT.label(),
                "ambiguous classification, using default"
            );
            ctx.ambiguities.push(Ambiguity {
                decision: ambiguous.decision,
                raw: ambiguous.raw,
                resolved: L::DEFAULT.label().to_string(),
            });
            L::DEFAULT
        }
    }
}

//! Orchestrator states and the transition table

use std::fmt;

use super::context::{Intent, RequestContext};

/// One step of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    ClassifyRequestKind,
    DecideNeedsData,
    ClassifyWriteKind,
    SynthesizeQuery,
    ExecuteQuery,
    DecideRefine,
    RegeneratePrompt,
    Respond,
}

impl State {
    pub const INITIAL: State = State::ClassifyRequestKind;

    pub fn name(&self) -> &'static str {
        match self {
            State::ClassifyRequestKind => "classify-request-kind",
            State::DecideNeedsData => "decide-needs-data",
            State::ClassifyWriteKind => "classify-write-kind",
            State::SynthesizeQuery => "synthesize-query",
            State::ExecuteQuery => "execute-query",
            State::DecideRefine => "decide-refine",
            State::RegeneratePrompt => "regenerate-prompt",
            State::Respond => "respond",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where to go after `state` has run, or `None` once the response exists
///
/// Pure: reads only the context fields the handler for `state` just set.
/// A missing decision routes to `Respond`.
pub fn next(state: State, ctx: &RequestContext) -> Option<State> {
    let to = match state {
        State::ClassifyRequestKind => match ctx.intent {
            Some(Intent::Read { .. }) => State::DecideNeedsData,
            Some(Intent::Write { .. }) => State::ClassifyWriteKind,
            None => State::Respond,
        },
        State::DecideNeedsData => match ctx.needs_data() {
            Some(true) => State::SynthesizeQuery,
            _ => State::Respond,
        },
        State::ClassifyWriteKind => State::SynthesizeQuery,
        State::SynthesizeQuery => State::ExecuteQuery,
        State::ExecuteQuery => {
            if ctx.is_read() {
                State::DecideRefine
            } else {
                State::Respond
            }
        }
        State::DecideRefine => match ctx.should_refine() {
            Some(true) => State::RegeneratePrompt,
            _ => State::Respond,
        },
        State::RegeneratePrompt => {
            if ctx.cap_exceeded {
                State::Respond
            } else {
                State::ClassifyRequestKind
            }
        }
        State::Respond => return None,
    };
    Some(to)
}

/// Upper bound on handler runs for one message
///
/// A pass visits at most six states before looping back, and there are at
/// most `max_refinements + 1` passes plus the final `Respond`.
pub fn step_limit(max_refinements: u32) -> usize {
    (max_refinements as usize).saturating_add(1).saturating_mul(6).saturating_add(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::context::WriteKind;

    fn ctx_with(intent: Option<Intent>) -> RequestContext {
        let mut ctx = RequestContext::new("msg");
        ctx.intent = intent;
        ctx
    }

    #[test]
    fn test_classify_routes_by_intent() {
        assert_eq!(
            next(State::ClassifyRequestKind, &ctx_with(Some(Intent::read()))),
            Some(State::DecideNeedsData)
        );
        assert_eq!(
            next(State::ClassifyRequestKind, &ctx_with(Some(Intent::write()))),
            Some(State::ClassifyWriteKind)
        );
        assert_eq!(next(State::ClassifyRequestKind, &ctx_with(None)), Some(State::Respond));
    }

    #[test]
    fn test_needs_data_routes() {
        let yes = ctx_with(Some(Intent::Read {
            needs_data: Some(true),
            should_refine: None,
        }));
        let no = ctx_with(Some(Intent::Read {
            needs_data: Some(false),
            should_refine: None,
        }));
        assert_eq!(next(State::DecideNeedsData, &yes), Some(State::SynthesizeQuery));
        assert_eq!(next(State::DecideNeedsData, &no), Some(State::Respond));
    }

    #[test]
    fn test_execute_routes_by_mode() {
        let read = ctx_with(Some(Intent::read()));
        let write = ctx_with(Some(Intent::Write {
            kind: Some(WriteKind::AdjustBudget),
        }));
        assert_eq!(next(State::ExecuteQuery, &read), Some(State::DecideRefine));
        assert_eq!(next(State::ExecuteQuery, &write), Some(State::Respond));
    }

    #[test]
    fn test_refine_loop_and_cap() {
        let refine = ctx_with(Some(Intent::Read {
            needs_data: Some(true),
            should_refine: Some(true),
        }));
        assert_eq!(next(State::DecideRefine, &refine), Some(State::RegeneratePrompt));

        let mut ctx = ctx_with(None);
        assert_eq!(next(State::RegeneratePrompt, &ctx), Some(State::ClassifyRequestKind));
        ctx.cap_exceeded = true;
        assert_eq!(next(State::RegeneratePrompt, &ctx), Some(State::Respond));
    }

    #[test]
    fn test_respond_is_terminal() {
        assert_eq!(next(State::Respond, &ctx_with(None)), None);
    }

    #[test]
    fn test_step_limit_covers_longest_path() {
        // Longest path for cap 1: two full read passes ending in the cap, then Respond
        assert_eq!(step_limit(1), 14);
        assert_eq!(step_limit(u32::MAX), (u32::MAX as usize + 1) * 6 + 2);
    }
}

//! Closed-set label parsing for model classifications
//!
//! A reply counts only if, after normalization, it is exactly one of the
//! labels the prompt offered, or a JSON object `{"label": "<LABEL>"}`.
//! There is no substring matching: "READ or WRITE" is ambiguous.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use super::context::WriteKind;

/// A decision the model answers with one of a fixed set of labels
pub trait Label: Copy + fmt::Debug + Sized + 'static {
    /// Decision name for logs
    const DECISION: &'static str;
    /// Accepted labels, in normalized form
    const LABELS: &'static [(&'static str, Self)];
    /// Value used when the reply matches no label
    const DEFAULT: Self;

    fn label(&self) -> &'static str;
}

/// The reply matched none of the offered labels
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ambiguous {decision} answer: {raw:?}")]
pub struct ClassificationAmbiguous {
    pub decision: &'static str,
    pub raw: String,
}

/// Read or write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Write,
}

/// Yes/no answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
}

/// Whether retrieved data answers the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineChoice {
    Refine,
    Respond,
}

impl Label for RequestKind {
    const DECISION: &'static str = "request-kind";
    const LABELS: &'static [(&'static str, Self)] = &[("READ", Self::Read), ("WRITE", Self::Write)];
    const DEFAULT: Self = Self::Write;

    fn label(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
        }
    }
}

impl Label for YesNo {
    const DECISION: &'static str = "needs-data";
    const LABELS: &'static [(&'static str, Self)] = &[("YES", Self::Yes), ("NO", Self::No)];
    const DEFAULT: Self = Self::No;

    fn label(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

// Unrecognized write kinds fall back to CreateGoal, matching the legacy router.
impl Label for WriteKind {
    const DECISION: &'static str = "write-kind";
    const LABELS: &'static [(&'static str, Self)] = &[
        ("ADJUST_BUDGET", Self::AdjustBudget),
        ("NEW_EXPENSE", Self::NewExpense),
        ("CREATE_GOAL", Self::CreateGoal),
    ];
    const DEFAULT: Self = Self::CreateGoal;

    fn label(&self) -> &'static str {
        match self {
            Self::AdjustBudget => "ADJUST_BUDGET",
            Self::NewExpense => "NEW_EXPENSE",
            Self::CreateGoal => "CREATE_GOAL",
        }
    }
}

impl Label for RefineChoice {
    const DECISION: &'static str = "refine";
    const LABELS: &'static [(&'static str, Self)] = &[("REFINE", Self::Refine), ("RESPOND", Self::Respond)];
    const DEFAULT: Self = Self::Respond;

    fn label(&self) -> &'static str {
        match self {
            Self::Refine => "REFINE",
            Self::Respond => "RESPOND",
        }
    }
}

/// Canonical form of a reply: trimmed of quotes and punctuation, upper case,
/// with whitespace and dash runs turned into single underscores
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c: char| !c.is_alphanumeric());
    trimmed
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Parse a reply into one of `L`'s labels
pub fn parse_label<L: Label>(raw: &str) -> Result<L, ClassificationAmbiguous> {
    debug!(decision = L::DECISION, raw_len = raw.len(), "parse_label: called");
    let ambiguous = || ClassificationAmbiguous {
        decision: L::DECISION,
        raw: raw.to_string(),
    };

    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|_| ambiguous())?;
        match value.get("label").and_then(|v| v.as_str()) {
            Some(label) => label.to_string(),
            None => return Err(ambiguous()),
        }
    } else {
        trimmed.to_string()
    };

    let normalized = normalize(&candidate);
    L::LABELS
        .iter()
        .find(|(label, _)| *label == normalized)
        .map(|(_, value)| *value)
        .ok_or_else(ambiguous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_labels() {
        assert_eq!(parse_label::<RequestKind>("READ"), Ok(RequestKind::Read));
        assert_eq!(parse_label::<RequestKind>("write"), Ok(RequestKind::Write));
        assert_eq!(parse_label::<YesNo>("Yes."), Ok(YesNo::Yes));
        assert_eq!(parse_label::<RefineChoice>("  \"RESPOND\"\n"), Ok(RefineChoice::Respond));
    }

    #[test]
    fn test_multiword_labels() {
        assert_eq!(parse_label::<WriteKind>("New Expense"), Ok(WriteKind::NewExpense));
        assert_eq!(parse_label::<WriteKind>("adjust-budget"), Ok(WriteKind::AdjustBudget));
        assert_eq!(parse_label::<WriteKind>("`CREATE_GOAL`"), Ok(WriteKind::CreateGoal));
    }

    #[test]
    fn test_json_label() {
        assert_eq!(parse_label::<RequestKind>(r#"{"label": "READ"}"#), Ok(RequestKind::Read));
        assert_eq!(
            parse_label::<WriteKind>(r#"{"label":"new expense","why":"purchase"}"#),
            Ok(WriteKind::NewExpense)
        );
        assert!(parse_label::<RequestKind>(r#"{"kind": "READ"}"#).is_err());
        assert!(parse_label::<RequestKind>(r#"{"label": "READ""#).is_err());
    }

    #[test]
    fn test_no_substring_matching() {
        assert!(parse_label::<RequestKind>("READ or WRITE").is_err());
        assert!(parse_label::<RequestKind>("I think this is a READ").is_err());
        assert!(parse_label::<YesNo>("Not sure").is_err());
        assert!(parse_label::<WriteKind>("Readjust budget").is_err());
    }

    #[test]
    fn test_ambiguous_carries_raw() {
        let err = parse_label::<YesNo>("maybe").unwrap_err();
        assert_eq!(err.decision, "needs-data");
        assert_eq!(err.raw, "maybe");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(RequestKind::DEFAULT, RequestKind::Write);
        assert_eq!(YesNo::DEFAULT, YesNo::No);
        assert_eq!(WriteKind::DEFAULT, WriteKind::CreateGoal);
        assert_eq!(RefineChoice::DEFAULT, RefineChoice::Respond);
    }

    fn write_kind() -> impl Strategy<Value = WriteKind> {
        prop_oneof![
            Just(WriteKind::AdjustBudget),
            Just(WriteKind::NewExpense),
            Just(WriteKind::CreateGoal),
        ]
    }

    proptest! {
        #[test]
        fn prop_wrapped_label_parses(kind in write_kind(), pad in "[ \t\n]{0,3}", quote in prop_oneof![Just(""), Just("\""), Just("'"), Just("`")]) {
            let raw = format!("{pad}{quote}{}{quote}.{pad}", kind.label().to_lowercase());
            prop_assert_eq!(parse_label::<WriteKind>(&raw), Ok(kind));
        }

        #[test]
        fn prop_parse_is_exact(raw in ".{0,40}") {
            match parse_label::<RequestKind>(&raw) {
                Ok(kind) => {
                    let normalized = if raw.trim().starts_with('{') {
                        kind.label().to_string()
                    } else {
                        normalize(&raw)
                    };
                    prop_assert_eq!(normalized, kind.label());
                }
                Err(e) => prop_assert_eq!(e.raw, raw),
            }
        }

        #[test]
        fn prop_extra_words_are_ambiguous(kind in write_kind(), word in "[a-z]{1,8}") {
            let raw = format!("{} {}", kind.label(), word);
            prop_assert!(parse_label::<WriteKind>(&raw).is_err());
        }
    }
}

// ============================================================
// Layer 3 — QA Record Domain Types
// ============================================================
// One flattened SQuAD-style question with its gold answer
// span(s), expressed in CHARACTER offsets into the context.
//
// Example:
//   context:      "The cat sat"
//   answer text:  "cat sat"
//   answer_start: 4          answer_end: 11
//
// Offsets come from annotation tools and are frequently off
// by one or two characters; `alignment` records what the span
// corrector found so downstream code never has to guess
// whether the offsets can be trusted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome of re-aligning a gold span against its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    /// Offsets reproduced the gold text as annotated.
    Exact,
    /// Offsets had drifted by this many characters and were moved back.
    Shifted(usize),
    /// No offset in the search window reproduced the gold text;
    /// the original offsets are kept but must not be trusted.
    Unresolved,
}

impl Alignment {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Alignment::Unresolved)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Exact => write!(f, "exact"),
            Alignment::Shifted(n) => write!(f, "shifted_{n}"),
            Alignment::Unresolved => write!(f, "unresolved"),
        }
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Alignment::Exact),
            "unresolved" => Ok(Alignment::Unresolved),
            other => other
                .strip_prefix("shifted_")
                .and_then(|n| n.parse().ok())
                .map(Alignment::Shifted)
                .ok_or_else(|| format!("unknown alignment {other:?}")),
        }
    }
}

/// One acceptable gold answer.
/// `answer_end` is exclusive: context[start..end] == text when resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSpan {
    pub text: String,
    pub answer_start: usize,
    pub answer_end: usize,
    pub alignment: Alignment,
}

impl AnswerSpan {
    /// A span straight from the annotation, before correction.
    /// The end is derived from the text length in characters and
    /// saturates rather than wrapping for absurd offsets.
    pub fn annotated(text: impl Into<String>, answer_start: usize) -> Self {
        let text = text.into();
        let answer_end = answer_start.saturating_add(text.chars().count());
        Self {
            text,
            answer_start,
            answer_end,
            alignment: Alignment::Unresolved,
        }
    }
}

/// Training record: exactly one gold span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: String,
    pub question: String,
    pub context: String,
    /// Factorized context group — records sharing a paragraph share this id.
    pub context_id: usize,
    pub answer: AnswerSpan,
}

/// Evaluation record: any number of acceptable gold spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEvalRecord {
    pub id: String,
    pub question: String,
    pub context: String,
    pub context_id: usize,
    pub answers: Vec<AnswerSpan>,
}

impl QaEvalRecord {
    /// Collapse to a single-span record for loss computation:
    /// the first resolved answer wins, falling back to the first
    /// answer, or an empty (unanswerable) span.
    pub fn primary_record(&self) -> QaRecord {
        let answer = self
            .answers
            .iter()
            .find(|a| a.alignment.is_resolved())
            .or_else(|| self.answers.first())
            .cloned()
            .unwrap_or_else(|| AnswerSpan::annotated("", 0));

        QaRecord {
            id: self.id.clone(),
            question: self.question.clone(),
            context: self.context.clone(),
            context_id: self.context_id,
            answer,
        }
    }
}

/// A QA record after tokenisation and framing.
/// Sequence layout: [CLS] question [SEP] context [SEP] [PAD]...
/// start/end are token indices (inclusive); 0 points at [CLS]
/// and means "no answer inside this window".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedQaExample {
    pub ids: Vec<i64>,
    pub mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
    pub start_position: usize,
    pub end_position: usize,
}

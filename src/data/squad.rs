// ============================================================
// Layer 4 — SQuAD Corpus Flattening and Offset Correction
// ============================================================
// Turns the nested SQuAD JSON
//
//   data[] → paragraphs[] → { context, qas[] → { id, question,
//                                                answers[] } }
//
// into flat records, then runs the span corrector over every
// answer.
//
//   Train mode: one QaRecord per (question, answer) pair.
//   Eval mode:  one QaEvalRecord per question, all answers kept.
//
// Malformed entries (missing fields, `answers` that is not a
// list, negative offsets, offsets no drift can bring back into
// the context) are skipped ONE AT A TIME with a
// SkipReason; the rest of the corpus is still processed and
// the reasons are tallied in the PreparationReport.
//
// Correction has no cross-record state, so it runs in parallel
// with rayon and is collected back in corpus order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::span_corrector::{correct_eval_record, correct_record, MAX_SHIFT};
use crate::domain::error::{DataError, DataResult};
use crate::domain::qa_record::{Alignment, AnswerSpan, QaEvalRecord, QaRecord};

// ─── Skip Reasons ─────────────────────────────────────────────────────────────
/// Why one raw entry did not make it into the flat corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A required field is absent or has the wrong type.
    MissingField { record: String, field: &'static str },
    /// `answers` exists but is not a list.
    AnswersNotList { record: String },
    /// An answer entry lacks text or a usable offset.
    InvalidAnswer { record: String, index: usize },
}

impl SkipReason {
    /// Stable key used to aggregate reasons in the report.
    pub fn kind(&self) -> String {
        match self {
            SkipReason::MissingField { field, .. } => format!("missing_{field}"),
            SkipReason::AnswersNotList { .. } => "answers_not_list".to_string(),
            SkipReason::InvalidAnswer { .. } => "invalid_answer".to_string(),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField { record, field } => {
                write!(f, "{record}: missing or invalid field `{field}`")
            }
            SkipReason::AnswersNotList { record } => write!(f, "{record}: `answers` is not a list"),
            SkipReason::InvalidAnswer { record, index } => {
                write!(f, "{record}: answer #{index} has no text or offset")
            }
        }
    }
}

/// Records that survived flattening, plus everything that did not.
#[derive(Debug, Clone)]
pub struct Flattened<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkipReason>,
}

// ─── Preparation Report ───────────────────────────────────────────────────────
/// Counts shown to the user after a corpus-wide preparation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationReport {
    pub records: usize,
    pub answers: usize,
    pub exact: usize,
    pub shifted: usize,
    pub unresolved: usize,
    pub skipped: usize,
    pub skip_reasons: BTreeMap<String, usize>,
    pub dropped_unresolved: usize,
    #[serde(default)]
    pub from_cache: bool,
}

impl PreparationReport {
    fn tally<'a>(&mut self, answers: impl Iterator<Item = &'a AnswerSpan>) {
        for a in answers {
            self.answers += 1;
            match a.alignment {
                Alignment::Exact => self.exact += 1,
                Alignment::Shifted(_) => self.shifted += 1,
                Alignment::Unresolved => self.unresolved += 1,
            }
        }
    }

    fn record_skips(&mut self, skipped: &[SkipReason]) {
        self.skipped = skipped.len();
        for reason in skipped {
            tracing::debug!("Skipping record: {}", reason);
            *self.skip_reasons.entry(reason.kind()).or_insert(0) += 1;
        }
        if !skipped.is_empty() {
            tracing::warn!(
                "Skipped {} malformed records: {:?}",
                skipped.len(),
                self.skip_reasons
            );
        }
    }

    /// Answers whose offsets were fixed or confirmed.
    pub fn corrected(&self) -> usize {
        self.exact + self.shifted
    }
}

impl fmt::Display for PreparationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records ({} answers): {} aligned ({} exact, {} shifted), {} unresolved, \
             {} skipped, {} dropped as unresolved{}",
            self.records,
            self.answers,
            self.corrected(),
            self.exact,
            self.shifted,
            self.unresolved,
            self.skipped,
            self.dropped_unresolved,
            if self.from_cache { " [cached]" } else { "" },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareOptions {
    /// Exclude records whose answers cannot be re-aligned
    /// instead of keeping them flagged as unresolved.
    pub drop_unresolved: bool,
}

// ─── Parsing ──────────────────────────────────────────────────────────────────
pub fn parse_squad(bytes: &[u8]) -> DataResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| DataError::json("parsing SQuAD corpus", e))
}

/// Walk every (paragraph, qa) pair, handing well-formed ones to `visit`.
fn walk_questions(
    root: &Value,
    skipped: &mut Vec<SkipReason>,
    mut visit: impl FnMut(&str, &Value, &str, &mut Vec<SkipReason>),
) -> DataResult<()> {
    let articles = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| DataError::MalformedCorpus("top-level `data` must be a list".into()))?;

    for (a, article) in articles.iter().enumerate() {
        let Some(paragraphs) = article.get("paragraphs").and_then(Value::as_array) else {
            skipped.push(SkipReason::MissingField {
                record: format!("article {a}"),
                field: "paragraphs",
            });
            continue;
        };

        for (p, paragraph) in paragraphs.iter().enumerate() {
            let location = format!("article {a} paragraph {p}");
            let Some(context) = paragraph.get("context").and_then(Value::as_str) else {
                skipped.push(SkipReason::MissingField {
                    record: location,
                    field: "context",
                });
                continue;
            };
            let Some(qas) = paragraph.get("qas").and_then(Value::as_array) else {
                skipped.push(SkipReason::MissingField {
                    record: location,
                    field: "qas",
                });
                continue;
            };

            for (q, qa) in qas.iter().enumerate() {
                let id = match qa.get("id") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => {
                        skipped.push(SkipReason::MissingField {
                            record: format!("{location} question {q}"),
                            field: "id",
                        });
                        continue;
                    }
                };
                visit(context, qa, &id, skipped);
            }
        }
    }
    Ok(())
}

/// `context_len` is in characters. An offset past the end of the
/// context by more than the corrector's largest shift can never
/// be re-aligned and is rejected here with the other bad answers.
fn parse_answer(answer: &Value, context_len: usize) -> Option<AnswerSpan> {
    let text = answer.get("text")?.as_str()?;
    let start = usize::try_from(answer.get("answer_start")?.as_u64()?).ok()?;
    if start > context_len.saturating_add(MAX_SHIFT) {
        return None;
    }
    start.checked_add(text.chars().count())?;
    Some(AnswerSpan::annotated(text, start))
}

/// The `answers` list of one question, or the reason it is unusable.
fn answers_of<'a>(qa: &'a Value, id: &str, skipped: &mut Vec<SkipReason>) -> Option<&'a Vec<Value>> {
    match qa.get("answers") {
        Some(Value::Array(list)) => Some(list),
        Some(_) => {
            skipped.push(SkipReason::AnswersNotList {
                record: id.to_string(),
            });
            None
        }
        None => {
            skipped.push(SkipReason::MissingField {
                record: id.to_string(),
                field: "answers",
            });
            None
        }
    }
}

/// Context strings → dense ids in order of first appearance.
#[derive(Default)]
struct ContextIds(HashMap<String, usize>);

impl ContextIds {
    fn id_for(&mut self, context: &str) -> usize {
        let next = self.0.len();
        *self.0.entry(context.to_string()).or_insert(next)
    }
}

pub fn flatten_train(root: &Value) -> DataResult<Flattened<QaRecord>> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut contexts = ContextIds::default();

    walk_questions(root, &mut skipped, |context, qa, id, skipped| {
        let Some(question) = qa.get("question").and_then(Value::as_str) else {
            skipped.push(SkipReason::MissingField {
                record: id.to_string(),
                field: "question",
            });
            return;
        };
        let Some(answers) = answers_of(qa, id, skipped) else {
            return;
        };

        // Questions without answers yield no training rows.
        let context_len = context.chars().count();
        for (i, raw) in answers.iter().enumerate() {
            match parse_answer(raw, context_len) {
                Some(answer) => records.push(QaRecord {
                    id: id.to_string(),
                    question: question.to_string(),
                    context: context.to_string(),
                    context_id: contexts.id_for(context),
                    answer,
                }),
                None => skipped.push(SkipReason::InvalidAnswer {
                    record: id.to_string(),
                    index: i,
                }),
            }
        }
    })?;

    Ok(Flattened { records, skipped })
}

pub fn flatten_eval(root: &Value) -> DataResult<Flattened<QaEvalRecord>> {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut contexts = ContextIds::default();

    walk_questions(root, &mut skipped, |context, qa, id, skipped| {
        let Some(question) = qa.get("question").and_then(Value::as_str) else {
            skipped.push(SkipReason::MissingField {
                record: id.to_string(),
                field: "question",
            });
            return;
        };
        let Some(raw_answers) = answers_of(qa, id, skipped) else {
            return;
        };

        let context_len = context.chars().count();
        let mut answers = Vec::with_capacity(raw_answers.len());
        for (i, raw) in raw_answers.iter().enumerate() {
            match parse_answer(raw, context_len) {
                Some(a) => answers.push(a),
                None => {
                    skipped.push(SkipReason::InvalidAnswer {
                        record: id.to_string(),
                        index: i,
                    });
                    return;
                }
            }
        }

        records.push(QaEvalRecord {
            id: id.to_string(),
            question: question.to_string(),
            context: context.to_string(),
            context_id: contexts.id_for(context),
            answers,
        });
    })?;

    Ok(Flattened { records, skipped })
}

// ─── Correction pass ──────────────────────────────────────────────────────────
/// Flatten, correct and (optionally) filter a training corpus.
pub fn prepare_train(
    root: &Value,
    options: PrepareOptions,
) -> DataResult<(Vec<QaRecord>, PreparationReport)> {
    let flat = flatten_train(root)?;
    let mut report = PreparationReport::default();
    report.record_skips(&flat.skipped);

    let corrected: Vec<QaRecord> = flat.records.par_iter().map(correct_record).collect();
    report.tally(corrected.iter().map(|r| &r.answer));

    let before = corrected.len();
    let records: Vec<QaRecord> = if options.drop_unresolved {
        corrected
            .into_iter()
            .filter(|r| r.answer.alignment.is_resolved())
            .collect()
    } else {
        corrected
    };
    report.dropped_unresolved = before - records.len();
    report.records = records.len();

    tracing::info!("Prepared training corpus: {}", report);
    Ok((records, report))
}

/// Flatten, correct and (optionally) filter an evaluation corpus.
/// A question is dropped only when it has answers and none resolve.
pub fn prepare_eval(
    root: &Value,
    options: PrepareOptions,
) -> DataResult<(Vec<QaEvalRecord>, PreparationReport)> {
    let flat = flatten_eval(root)?;
    let mut report = PreparationReport::default();
    report.record_skips(&flat.skipped);

    let corrected: Vec<QaEvalRecord> = flat.records.par_iter().map(correct_eval_record).collect();
    report.tally(corrected.iter().flat_map(|r| r.answers.iter()));

    let before = corrected.len();
    let records: Vec<QaEvalRecord> = if options.drop_unresolved {
        corrected
            .into_iter()
            .filter(|r| r.answers.is_empty() || r.answers.iter().any(|a| a.alignment.is_resolved()))
            .collect()
    } else {
        corrected
    };
    report.dropped_unresolved = before - records.len();
    report.records = records.len();

    tracing::info!("Prepared evaluation corpus: {}", report);
    Ok((records, report))
}

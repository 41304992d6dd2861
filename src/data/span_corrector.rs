// ============================================================
// Layer 4 — Span Corrector
// ============================================================
// Re-aligns annotated answer offsets with their context.
//
// Annotation tools often record answer_start a character or two
// too far to the right (inconsistent whitespace or Unicode
// normalisation between the tool and the stored text). A small
// bounded search recovers nearly all of these:
//
//   context: "The cat sat"        gold: "cat sat"
//   claimed start 5 → "at sat"    ✗
//   shift by 1      → "cat sat"   ✓  → (4, 11)
//
// Offsets are CHARACTER offsets (as in SQuAD), not bytes.
// Records are never mutated in place: every function here
// returns a new, corrected value.

use crate::domain::qa_record::{Alignment, AnswerSpan, QaEvalRecord, QaRecord};

/// Drifts tried after the exact check, smallest first.
pub const SEARCH_WINDOW: [usize; 2] = [1, 2];

/// Largest drift the corrector can undo.
pub const MAX_SHIFT: usize = SEARCH_WINDOW[SEARCH_WINDOW.len() - 1];

/// Return the (start, end) character span reproducing `gold_text`,
/// or None if neither the claimed offset nor any shift in the
/// search window does.
pub fn correct(context: &str, gold_text: &str, claimed_start: usize) -> Option<(usize, usize)> {
    correct_with_shift(context, gold_text, claimed_start).map(|(start, end, _)| (start, end))
}

/// Same as `correct`, also reporting how far the span was moved.
pub fn correct_with_shift(
    context: &str,
    gold_text: &str,
    claimed_start: usize,
) -> Option<(usize, usize, usize)> {
    let end = claimed_start.checked_add(gold_text.chars().count())?;

    if char_slice(context, claimed_start, end) == Some(gold_text) {
        return Some((claimed_start, end, 0));
    }

    SEARCH_WINDOW.iter().find_map(|&n| {
        let start = claimed_start.checked_sub(n)?;
        (char_slice(context, start, end - n) == Some(gold_text)).then_some((start, end - n, n))
    })
}

/// Correct one answer span against its context.
/// An unresolved span keeps its original offsets.
pub fn correct_answer(context: &str, answer: &AnswerSpan) -> AnswerSpan {
    match correct_with_shift(context, &answer.text, answer.answer_start) {
        Some((start, end, shift)) => AnswerSpan {
            text: answer.text.clone(),
            answer_start: start,
            answer_end: end,
            alignment: if shift == 0 {
                Alignment::Exact
            } else {
                Alignment::Shifted(shift)
            },
        },
        None => AnswerSpan {
            text: answer.text.clone(),
            answer_start: answer.answer_start,
            answer_end: answer.answer_start.saturating_add(answer.text.chars().count()),
            alignment: Alignment::Unresolved,
        },
    }
}

pub fn correct_record(record: &QaRecord) -> QaRecord {
    QaRecord {
        answer: correct_answer(&record.context, &record.answer),
        ..record.clone()
    }
}

/// Every acceptable answer is corrected independently.
pub fn correct_eval_record(record: &QaEvalRecord) -> QaEvalRecord {
    QaEvalRecord {
        answers: record
            .answers
            .iter()
            .map(|a| correct_answer(&record.context, a))
            .collect(),
        ..record.clone()
    }
}

/// Slice `s` by character offsets [start, end).
/// Out-of-range or inverted bounds give None instead of panicking.
pub fn char_slice(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let from = char_to_byte(s, start)?;
    let to = char_to_byte(s, end)?;
    Some(&s[from..to])
}

/// Byte index of the `n`-th character; `n == char count` maps to s.len().
fn char_to_byte(s: &str, n: usize) -> Option<usize> {
    s.char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(s.len()))
        .nth(n)
}

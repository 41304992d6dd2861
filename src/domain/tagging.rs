// ============================================================
// Layer 3 — Tagging Domain Types
// ============================================================
// A sentence annotated with one POS label and one entity tag
// per word, and the five parallel arrays it becomes once it
// has been expanded to subword tokens and framed.
//
// Example:
//   words:  ["Manash", "lives", "here"]
//   pos:    [   3,        7,      5  ]
//   tags:   [   2,        1,      1  ]
//
// Label ids come from a LabelVocabulary, so 0 is never a real
// category — it is the padding / sentinel label.

use serde::{Deserialize, Serialize};

use crate::domain::error::{DataError, DataResult};

/// One annotated sentence. Immutable once constructed; the
/// constructor is the only place the length invariant is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSentence {
    words: Vec<String>,
    pos_labels: Vec<i64>,
    tag_labels: Vec<i64>,
}

impl TaggedSentence {
    /// Build a sentence, failing fast when the three columns
    /// disagree in length (a programmer error, never truncated).
    pub fn new(
        words: Vec<String>,
        pos_labels: Vec<i64>,
        tag_labels: Vec<i64>,
    ) -> DataResult<Self> {
        if pos_labels.len() != words.len() {
            return Err(DataError::LengthMismatch {
                context: "pos labels",
                expected: words.len(),
                actual: pos_labels.len(),
            });
        }
        if tag_labels.len() != words.len() {
            return Err(DataError::LengthMismatch {
                context: "tag labels",
                expected: words.len(),
                actual: tag_labels.len(),
            });
        }
        Ok(Self {
            words,
            pos_labels,
            tag_labels,
        })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn pos_labels(&self) -> &[i64] {
        &self.pos_labels
    }

    pub fn tag_labels(&self) -> &[i64] {
        &self.tag_labels
    }
}

/// A tagging example after label expansion and framing.
/// All five arrays have the same fixed width (MAX_LEN).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTaggingExample {
    pub ids: Vec<i64>,
    pub mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
    pub target_pos: Vec<i64>,
    pub target_tag: Vec<i64>,
}

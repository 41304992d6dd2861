// ============================================================
// Layer 4 — Label Expander
// ============================================================
// Word-level labels → subword-level labels.
//
// A pretrained tokenizer splits rare words into several pieces:
//
//   words:   ["Manash",          "lives"]
//   labels:  [   5,                 2   ]
//   pieces:  [ma, ##na, ##sh],   [lives]
//   →  token_ids: [ma, ##na, ##sh, lives]
//      labels:    [ 5,    5,    5,    2 ]
//
// Each word's label is repeated once per piece the word became,
// so every token stays aligned with the label of its word.
// No sentinels are added here — that is the framer's job.

use crate::domain::error::{DataError, DataResult};
use crate::domain::traits::TokenizerAdapter;

/// Subword ids with any number of parallel, expanded label streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedSequence {
    pub token_ids: Vec<i64>,
    pub label_streams: Vec<Vec<i64>>,
}

/// Expand any number of label streams (POS and TAG) with one
/// tokenizer call per word.
///
/// Every stream must have exactly one label per word. A word the
/// tokenizer turns into zero pieces contributes nothing to any
/// output; tokenizer errors are propagated untouched.
pub fn expand(
    tokenizer: &dyn TokenizerAdapter,
    words: &[String],
    streams: &[&[i64]],
) -> DataResult<ExpandedSequence> {
    for stream in streams {
        if stream.len() != words.len() {
            return Err(DataError::LengthMismatch {
                context: "label expansion",
                expected: words.len(),
                actual: stream.len(),
            });
        }
    }

    let mut token_ids = Vec::with_capacity(words.len());
    let mut label_streams: Vec<Vec<i64>> = streams
        .iter()
        .map(|_| Vec::with_capacity(words.len()))
        .collect();

    for (i, word) in words.iter().enumerate() {
        let pieces = tokenizer.encode(word, false)?;
        let n = pieces.len();
        token_ids.extend(pieces.into_iter().map(i64::from));

        for (out, stream) in label_streams.iter_mut().zip(streams) {
            out.extend(std::iter::repeat(stream[i]).take(n));
        }
    }

    Ok(ExpandedSequence {
        token_ids,
        label_streams,
    })
}

// ============================================================
// Layer 4 — Tagging Example Builder
// ============================================================
// One annotated sentence → one EncodedTaggingExample:
//
//   TaggedSentence ──expand──▶ subword ids + POS/TAG
//                  ──frame───▶ ids, mask, token_type_ids,
//                              target_pos, target_tag
//
// Stateless per call: the same sentence always encodes to the
// same arrays, and any index can be encoded in any order, which
// is what shuffled batch sampling needs.

use std::sync::Arc;

use crate::data::expander::expand;
use crate::data::framer::SequenceFramer;
use crate::domain::error::DataResult;
use crate::domain::tagging::{EncodedTaggingExample, TaggedSentence};
use crate::domain::traits::TokenizerAdapter;

#[derive(Clone)]
pub struct TaggingEncoder {
    tokenizer: Arc<dyn TokenizerAdapter>,
    framer: SequenceFramer,
}

impl TaggingEncoder {
    pub fn new(tokenizer: Arc<dyn TokenizerAdapter>, framer: SequenceFramer) -> Self {
        Self { tokenizer, framer }
    }

    pub fn encode(&self, sentence: &TaggedSentence) -> DataResult<EncodedTaggingExample> {
        let expanded = expand(
            self.tokenizer.as_ref(),
            sentence.words(),
            &[sentence.pos_labels(), sentence.tag_labels()],
        )?;

        let mut framed = self.framer.frame(
            &expanded.token_ids,
            &[&expanded.label_streams[0], &expanded.label_streams[1]],
        );
        let target_tag = framed.label_streams.pop().unwrap_or_default();
        let target_pos = framed.label_streams.pop().unwrap_or_default();

        Ok(EncodedTaggingExample {
            ids: framed.ids,
            mask: framed.mask,
            token_type_ids: framed.token_type_ids,
            target_pos,
            target_tag,
        })
    }
}

// ============================================================
// Layer 4 — QA Example Builder
// ============================================================
// One QaRecord → one EncodedQaExample:
//
//   Step 1: correct the gold span        (span_corrector)
//   Step 2: encode (question, context)   (tokenizer adapter)
//   Step 3: truncate the context suffix  (PairEncoding)
//   Step 4: char span → token span       (offset_mapper)
//   Step 5: pad to max_len               (SequenceFramer)
//
// Segment ids are 0 for "[CLS] question [SEP]" and 1 for
// "context [SEP]". An answer that cannot be aligned, or that
// was cut off by truncation, points at [CLS] (0, 0).

use std::sync::Arc;

use crate::data::framer::SequenceFramer;
use crate::data::offset_mapper::char_span_to_token_span;
use crate::data::span_corrector::correct;
use crate::domain::error::DataResult;
use crate::domain::qa_record::{EncodedQaExample, QaRecord};
use crate::domain::traits::TokenizerAdapter;

#[derive(Clone)]
pub struct QaEncoder {
    tokenizer: Arc<dyn TokenizerAdapter>,
    framer: SequenceFramer,
}

impl QaEncoder {
    pub fn new(tokenizer: Arc<dyn TokenizerAdapter>, framer: SequenceFramer) -> Self {
        Self { tokenizer, framer }
    }

    pub fn encode(&self, record: &QaRecord) -> DataResult<EncodedQaExample> {
        // Already-corrected records match exactly here, so this is
        // a no-op for prepared corpora and a fix for raw ones.
        let span = correct(
            &record.context,
            &record.answer.text,
            record.answer.answer_start,
        );

        let mut pair = self.tokenizer.encode_plus(&record.question, &record.context)?;
        pair.truncate_second(self.framer.max_len());

        let (start_position, end_position) = span
            .and_then(|(start, end)| {
                char_span_to_token_span(&pair.offsets, &pair.type_ids, start, end)
            })
            .unwrap_or((0, 0));

        let ids: Vec<i64> = pair.ids.iter().map(|&id| i64::from(id)).collect();
        let type_ids: Vec<i64> = pair.type_ids.iter().map(|&t| i64::from(t)).collect();
        let framed = self.framer.frame_pair(&ids, &type_ids);

        Ok(EncodedQaExample {
            ids: framed.ids,
            mask: framed.mask,
            token_type_ids: framed.token_type_ids,
            start_position,
            end_position,
        })
    }
}

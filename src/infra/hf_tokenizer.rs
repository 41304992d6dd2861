// ============================================================
// Layer 6 — HuggingFace Tokenizer Adapter
// ============================================================
// Implements the domain's TokenizerAdapter over a
// `tokenizers::Tokenizer` loaded from a tokenizer.json.
//
// The sentinels are added here rather than by the tokenizer's
// own post-processor, so [CLS]=101 / [SEP]=102 hold no matter
// which tokenizer.json is loaded.
//
// Offsets come from `encode_char_offsets`, i.e. they count
// characters, the same unit SQuAD uses for answer_start.

use std::path::Path;

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::framer::{CLS_TOKEN_ID, SEP_TOKEN_ID};
use crate::domain::error::{DataError, DataResult};
use crate::domain::traits::{PairEncoding, TokenizerAdapter};

const CLS: u32 = CLS_TOKEN_ID as u32;
const SEP: u32 = SEP_TOKEN_ID as u32;

pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        let cls = inner.token_to_id("[CLS]");
        let sep = inner.token_to_id("[SEP]");
        if cls != Some(CLS) || sep != Some(SEP) {
            tracing::warn!(
                "Tokenizer maps [CLS]/[SEP] to {:?}/{:?}; sequences are still framed with {}/{}",
                cls,
                sep,
                CLS,
                SEP
            );
        }
        Self { inner }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = Tokenizer::from_file(path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        Ok(Self::new(inner))
    }

    /// Embedding table size the model needs for this vocabulary.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    fn pieces(&self, text: &str) -> DataResult<(Vec<u32>, Vec<(usize, usize)>)> {
        let enc = self
            .inner
            .encode_char_offsets(text, false)
            .map_err(|e| DataError::tokenizer(text, e))?;
        Ok((enc.get_ids().to_vec(), enc.get_offsets().to_vec()))
    }
}

impl TokenizerAdapter for HfTokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> DataResult<Vec<u32>> {
        let (ids, _) = self.pieces(text)?;
        if !add_special_tokens {
            return Ok(ids);
        }
        let mut framed = Vec::with_capacity(ids.len() + 2);
        framed.push(CLS);
        framed.extend(ids);
        framed.push(SEP);
        Ok(framed)
    }

    fn encode_plus(&self, text_a: &str, text_b: &str) -> DataResult<PairEncoding> {
        let (a_ids, a_offsets) = self.pieces(text_a)?;
        let (b_ids, b_offsets) = self.pieces(text_b)?;

        let len = a_ids.len() + b_ids.len() + 3;
        let mut enc = PairEncoding {
            ids: Vec::with_capacity(len),
            type_ids: Vec::with_capacity(len),
            offsets: Vec::with_capacity(len),
        };

        // [CLS] a [SEP]
        enc.ids.push(CLS);
        enc.ids.extend(&a_ids);
        enc.ids.push(SEP);
        enc.offsets.push((0, 0));
        enc.offsets.extend(&a_offsets);
        enc.offsets.push((0, 0));
        enc.type_ids.resize(a_ids.len() + 2, 0);

        // b [SEP]
        enc.ids.extend(&b_ids);
        enc.ids.push(SEP);
        enc.offsets.extend(&b_offsets);
        enc.offsets.push((0, 0));
        enc.type_ids.resize(len, 1);

        Ok(enc)
    }
}

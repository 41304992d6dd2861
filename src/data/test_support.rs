// Deterministic tokenizer fakes shared by the data-layer tests.

use crate::domain::error::{DataError, DataResult};
use crate::domain::traits::{PairEncoding, TokenizerAdapter};

/// Splits on whitespace, then cuts every word into pieces of at
/// most `chunk` characters. A piece's id is derived from its text,
/// so equal pieces always get equal ids.
pub(crate) struct ChunkTokenizer {
    pub chunk: usize,
}

impl ChunkTokenizer {
    pub(crate) fn new(chunk: usize) -> Self {
        Self { chunk }
    }

    fn pieces(&self, text: &str) -> Vec<(u32, (usize, usize))> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i].is_whitespace() {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            let mut s = start;
            while s < i {
                let e = (s + self.chunk).min(i);
                let id = 1000 + chars[s..e].iter().map(|&c| c as u32).sum::<u32>() % 9000;
                out.push((id, (s, e)));
                s = e;
            }
        }
        out
    }
}

impl TokenizerAdapter for ChunkTokenizer {
    fn encode(&self, text: &str, add_special_tokens: bool) -> DataResult<Vec<u32>> {
        let mut ids: Vec<u32> = self.pieces(text).into_iter().map(|(id, _)| id).collect();
        if add_special_tokens {
            ids.insert(0, 101);
            ids.push(102);
        }
        Ok(ids)
    }

    fn encode_plus(&self, text_a: &str, text_b: &str) -> DataResult<PairEncoding> {
        let a = self.pieces(text_a);
        let b = self.pieces(text_b);

        let mut enc = PairEncoding {
            ids: vec![101],
            type_ids: vec![0],
            offsets: vec![(0, 0)],
        };
        for (id, off) in a {
            enc.ids.push(id);
            enc.type_ids.push(0);
            enc.offsets.push(off);
        }
        enc.ids.push(102);
        enc.type_ids.push(0);
        enc.offsets.push((0, 0));
        for (id, off) in b {
            enc.ids.push(id);
            enc.type_ids.push(1);
            enc.offsets.push(off);
        }
        enc.ids.push(102);
        enc.type_ids.push(1);
        enc.offsets.push((0, 0));
        Ok(enc)
    }
}

/// Rejects every input.
pub(crate) struct FailingTokenizer;

impl TokenizerAdapter for FailingTokenizer {
    fn encode(&self, text: &str, _add_special_tokens: bool) -> DataResult<Vec<u32>> {
        Err(DataError::tokenizer(text, "unsupported character"))
    }

    fn encode_plus(&self, text_a: &str, _text_b: &str) -> DataResult<PairEncoding> {
        Err(DataError::tokenizer(text_a, "unsupported character"))
    }
}

pub(crate) fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| w.to_string()).collect()
}

// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The pretrained tokenizer is an external collaborator. The
// data layer only ever talks to it through TokenizerAdapter,
// so the alignment code can be unit tested with a tiny fake
// and run in production over a HuggingFace tokenizer.json.
//
// Implementations:
//   - HfTokenizer (infra) → wraps tokenizers::Tokenizer
//   - test fakes          → deterministic character chunkers

use crate::domain::error::DataResult;

// ─── TokenizerAdapter ─────────────────────────────────────────────────────────
/// Any component that can split text into subword token ids.
///
/// Send + Sync because Burn's DataLoader workers share one
/// adapter behind an Arc while encoding examples on demand.
pub trait TokenizerAdapter: Send + Sync {
    /// Token ids for `text`. With `add_special_tokens == false`
    /// no sentinels are added; a word may yield several ids,
    /// or none at all for whitespace-only input.
    fn encode(&self, text: &str, add_special_tokens: bool) -> DataResult<Vec<u32>>;

    /// Encode a (question, context) pair as
    /// `[CLS] a [SEP] b [SEP]` with segment ids and char offsets.
    fn encode_plus(&self, text_a: &str, text_b: &str) -> DataResult<PairEncoding>;
}

// ─── PairEncoding ─────────────────────────────────────────────────────────────
/// Output of `encode_plus`. The three vectors are parallel.
///
/// `offsets[i]` is the (start, end) CHARACTER range of token i
/// within its own segment's text; sentinels carry (0, 0).
/// `type_ids` is 0 for `[CLS] a [SEP]` and 1 for `b [SEP]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEncoding {
    pub ids: Vec<u32>,
    pub type_ids: Vec<u32>,
    pub offsets: Vec<(usize, usize)>,
}

impl PairEncoding {
    /// Index of the [SEP] that closes segment a.
    fn first_separator(&self) -> usize {
        self.type_ids
            .iter()
            .position(|&t| t == 1)
            .map(|i| i.saturating_sub(1))
            .unwrap_or(self.ids.len().saturating_sub(1))
    }

    /// Shrink to at most `max_len` tokens, keeping all sentinels.
    ///
    /// Context tokens are dropped from the END first (keep prefix,
    /// drop suffix). Only if the question alone still does not
    /// fit are question tokens dropped, also from the end.
    pub fn truncate_second(&mut self, max_len: usize) {
        if self.ids.len() <= max_len {
            return;
        }

        // ── Context: tokens between the two [SEP]s ───────────────────────────
        let first_sep = self.first_separator();
        let last_sep = self.ids.len() - 1;
        let context_tokens = last_sep.saturating_sub(first_sep + 1);
        let overflow = self.ids.len() - max_len;
        let drop = overflow.min(context_tokens);
        self.remove_range(last_sep - drop, last_sep);

        if self.ids.len() <= max_len {
            return;
        }

        // ── Question: tokens between [CLS] and the first [SEP] ────────────────
        let first_sep = self.first_separator();
        let question_tokens = first_sep.saturating_sub(1);
        let overflow = self.ids.len() - max_len;
        let drop = overflow.min(question_tokens);
        self.remove_range(first_sep - drop, first_sep);

        // Only sentinels left and still too wide: nothing sensible remains.
        if self.ids.len() > max_len {
            self.ids.truncate(max_len);
            self.type_ids.truncate(max_len);
            self.offsets.truncate(max_len);
        }
    }

    fn remove_range(&mut self, from: usize, to: usize) {
        self.ids.drain(from..to);
        self.type_ids.drain(from..to);
        self.offsets.drain(from..to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// [CLS] q1 q2 [SEP] c1 c2 c3 c4 [SEP]
    fn pair() -> PairEncoding {
        PairEncoding {
            ids: vec![101, 11, 12, 102, 21, 22, 23, 24, 102],
            type_ids: vec![0, 0, 0, 0, 1, 1, 1, 1, 1],
            offsets: vec![
                (0, 0),
                (0, 2),
                (3, 5),
                (0, 0),
                (0, 3),
                (4, 6),
                (7, 9),
                (10, 12),
                (0, 0),
            ],
        }
    }

    #[test]
    fn test_no_truncation_when_it_fits() {
        let mut p = pair();
        p.truncate_second(16);
        assert_eq!(p, pair());
    }

    #[test]
    fn test_drops_context_suffix_first() {
        let mut p = pair();
        p.truncate_second(7);
        assert_eq!(p.ids, vec![101, 11, 12, 102, 21, 22, 102]);
        assert_eq!(p.type_ids, vec![0, 0, 0, 0, 1, 1, 1]);
        assert_eq!(p.offsets[5], (4, 6));
        assert_eq!(p.offsets[6], (0, 0));
    }

    #[test]
    fn test_drops_question_suffix_when_context_is_exhausted() {
        let mut p = pair();
        p.truncate_second(4);
        assert_eq!(p.ids, vec![101, 11, 102, 102]);
        assert_eq!(p.type_ids, vec![0, 0, 0, 1]);
    }
}

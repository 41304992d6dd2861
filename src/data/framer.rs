// ============================================================
// Layer 4 — Sequence Framer
// ============================================================
// Turns a variable-length token sequence (plus any number of
// parallel label streams) into fixed-width arrays:
//
//   Step 1: truncate everything to max_len - 2 (keep prefix)
//   Step 2: [CLS] ids [SEP], and 0 label on both ends
//   Step 3: mask = 1s, token_type_ids = 0s (single segment)
//   Step 4: right-pad every array with 0 up to max_len
//
// Example with max_len = 8:
//   ids:    [7, 8, 9]
//   → ids:  [101, 7, 8, 9, 102, 0, 0, 0]
//     mask: [  1, 1, 1, 1,   1, 0, 0, 0]
//
// Every array returned has length exactly max_len, whatever
// the input length. The framer holds nothing but max_len, so
// it can be shared freely across DataLoader workers.

use crate::domain::error::{DataError, DataResult};

/// [CLS] — first position of every framed sequence.
pub const CLS_TOKEN_ID: i64 = 101;
/// [SEP] — closes every segment.
pub const SEP_TOKEN_ID: i64 = 102;
/// Padding value for ids, mask, segment ids and labels alike.
pub const PAD_VALUE: i64 = 0;

/// Fixed-width parallel arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedSequence {
    pub ids: Vec<i64>,
    pub mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
    pub label_streams: Vec<Vec<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceFramer {
    max_len: usize,
}

impl SequenceFramer {
    /// `max_len` must have room for the two sentinels.
    pub fn new(max_len: usize) -> DataResult<Self> {
        if max_len < 2 {
            return Err(DataError::InvalidMaxLen(max_len));
        }
        Ok(Self { max_len })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Frame a single-segment sequence and its label streams.
    /// Each label stream is expected to be parallel to `token_ids`.
    pub fn frame(&self, token_ids: &[i64], label_streams: &[&[i64]]) -> FramedSequence {
        let keep = self.max_len - 2;

        let ids = self.with_sentinels(token_ids, keep, CLS_TOKEN_ID, SEP_TOKEN_ID);
        let label_streams = label_streams
            .iter()
            .map(|labels| {
                debug_assert_eq!(labels.len(), token_ids.len());
                self.pad(self.with_sentinels(labels, keep, PAD_VALUE, PAD_VALUE))
            })
            .collect();

        let len = ids.len();
        FramedSequence {
            ids: self.pad(ids),
            mask: self.pad(vec![1; len]),
            token_type_ids: self.pad(vec![0; len]),
            label_streams,
        }
    }

    /// Pad an already-framed pair sequence (sentinels present,
    /// segment ids supplied). Input longer than max_len is cut.
    pub fn frame_pair(&self, ids: &[i64], token_type_ids: &[i64]) -> FramedSequence {
        let len = ids.len().min(self.max_len);
        FramedSequence {
            ids: self.pad(ids[..len].to_vec()),
            mask: self.pad(vec![1; len]),
            token_type_ids: self.pad(token_type_ids[..len.min(token_type_ids.len())].to_vec()),
            label_streams: Vec::new(),
        }
    }

    fn with_sentinels(&self, values: &[i64], keep: usize, first: i64, last: i64) -> Vec<i64> {
        let body = &values[..values.len().min(keep)];
        let mut out = Vec::with_capacity(body.len() + 2);
        out.push(first);
        out.extend_from_slice(body);
        out.push(last);
        out
    }

    fn pad(&self, mut values: Vec<i64>) -> Vec<i64> {
        let padding_len = self.max_len.saturating_sub(values.len());
        values.extend(std::iter::repeat(PAD_VALUE).take(padding_len));
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_invariants(f: &FramedSequence, max_len: usize) {
        assert_eq!(f.ids.len(), max_len);
        assert_eq!(f.mask.len(), max_len);
        assert_eq!(f.token_type_ids.len(), max_len);
        for s in &f.label_streams {
            assert_eq!(s.len(), max_len);
        }

        assert_eq!(f.ids[0], CLS_TOKEN_ID);
        assert_eq!(f.mask[0], 1);

        let real = f.mask.iter().filter(|&&m| m == 1).count();
        assert_eq!(f.ids[real - 1], SEP_TOKEN_ID);

        for k in 0..max_len {
            if f.mask[k] == 0 {
                assert_eq!(f.ids[k], 0);
                assert_eq!(f.token_type_ids[k], 0);
                for s in &f.label_streams {
                    assert_eq!(s[k], 0);
                }
            }
        }
    }

    #[test]
    fn test_length_invariant_for_all_input_sizes() {
        let max_len = 10;
        let framer = SequenceFramer::new(max_len).unwrap();
        for n in [0usize, 1, max_len - 2, max_len - 1, max_len, 1000] {
            let ids: Vec<i64> = (1..=n as i64).collect();
            let labels: Vec<i64> = ids.iter().map(|i| i % 4 + 1).collect();
            let f = framer.frame(&ids, &[&labels, &labels]);
            check_invariants(&f, max_len);
        }
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        // 10 single-token words, labels 1..=10, max_len 8.
        let framer = SequenceFramer::new(8).unwrap();
        let ids: Vec<i64> = (2001..=2010).collect();
        let labels: Vec<i64> = (1..=10).collect();
        let f = framer.frame(&ids, &[&labels]);

        assert_eq!(f.ids, vec![101, 2001, 2002, 2003, 2004, 2005, 2006, 102]);
        assert_eq!(f.label_streams[0], vec![0, 1, 2, 3, 4, 5, 6, 0]);
        assert_eq!(f.mask, vec![1; 8]);
    }

    #[test]
    fn test_short_sequence_is_padded() {
        let framer = SequenceFramer::new(8).unwrap();
        let f = framer.frame(&[7, 8, 9], &[&[3, 3, 4]]);
        assert_eq!(f.ids, vec![101, 7, 8, 9, 102, 0, 0, 0]);
        assert_eq!(f.mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(f.token_type_ids, vec![0; 8]);
        assert_eq!(f.label_streams[0], vec![0, 3, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_empty_input_is_just_sentinels() {
        let framer = SequenceFramer::new(4).unwrap();
        let f = framer.frame(&[], &[&[]]);
        assert_eq!(f.ids, vec![101, 102, 0, 0]);
        assert_eq!(f.label_streams[0], vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_minimum_width_holds_only_sentinels() {
        let framer = SequenceFramer::new(2).unwrap();
        let f = framer.frame(&[5, 6, 7], &[]);
        assert_eq!(f.ids, vec![101, 102]);
    }

    #[test]
    fn test_rejects_width_below_two() {
        assert!(matches!(
            SequenceFramer::new(1),
            Err(DataError::InvalidMaxLen(1))
        ));
    }

    #[test]
    fn test_frame_pair_keeps_segment_ids() {
        let framer = SequenceFramer::new(8).unwrap();
        let f = framer.frame_pair(&[101, 5, 102, 6, 102], &[0, 0, 0, 1, 1]);
        assert_eq!(f.ids, vec![101, 5, 102, 6, 102, 0, 0, 0]);
        assert_eq!(f.token_type_ids, vec![0, 0, 0, 1, 1, 0, 0, 0]);
        assert_eq!(f.mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
    }
}

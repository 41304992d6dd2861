// ============================================================
// Layer 4 — Offset-to-Token Mapper
// ============================================================
// Converts a character span inside the context into the token
// indices the span-extraction head is trained to predict.
//
//   tokens:  [CLS] who [SEP] the  cat  sat  [SEP]
//   type:      0    0    0    1    1    1     1
//   offsets: (0,0)(0,3)(0,0)(0,3)(4,7)(8,11)(0,0)
//   answer chars (4, 11) → tokens (4, 5)
//
// Only context tokens (segment 1, non-sentinel) are considered.
// If the answer is not fully covered by the context that
// survived truncation, there is no valid target and the caller
// falls back to the [CLS] position.

/// Map `[answer_start, answer_end)` (chars) to an inclusive
/// `(start_token, end_token)` pair.
pub fn char_span_to_token_span(
    offsets: &[(usize, usize)],
    type_ids: &[u32],
    answer_start: usize,
    answer_end: usize,
) -> Option<(usize, usize)> {
    if answer_end <= answer_start {
        return None;
    }

    let context_tokens: Vec<usize> = (0..offsets.len().min(type_ids.len()))
        .filter(|&i| type_ids[i] == 1 && offsets[i] != (0, 0))
        .collect();

    // The kept context must reach the end of the answer.
    let last = *context_tokens.last()?;
    if offsets[last].1 < answer_end {
        return None;
    }

    let start = context_tokens
        .iter()
        .copied()
        .find(|&i| offsets[i].1 > answer_start)?;
    let end = context_tokens
        .iter()
        .rev()
        .copied()
        .find(|&i| offsets[i].0 < answer_end)?;

    (start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSETS: [(usize, usize); 7] = [(0, 0), (0, 3), (0, 0), (0, 3), (4, 7), (8, 11), (0, 0)];
    const TYPES: [u32; 7] = [0, 0, 0, 1, 1, 1, 1];

    #[test]
    fn test_maps_multi_token_answer() {
        assert_eq!(char_span_to_token_span(&OFFSETS, &TYPES, 4, 11), Some((4, 5)));
    }

    #[test]
    fn test_maps_first_context_token() {
        // (0, 3) in the question must not be picked up.
        assert_eq!(char_span_to_token_span(&OFFSETS, &TYPES, 0, 3), Some((3, 3)));
    }

    #[test]
    fn test_partial_token_answer_covers_whole_token() {
        // "at" inside "cat"
        assert_eq!(char_span_to_token_span(&OFFSETS, &TYPES, 5, 7), Some((4, 4)));
    }

    #[test]
    fn test_answer_beyond_truncated_context() {
        assert_eq!(char_span_to_token_span(&OFFSETS, &TYPES, 8, 15), None);
    }

    #[test]
    fn test_empty_answer_has_no_span() {
        assert_eq!(char_span_to_token_span(&OFFSETS, &TYPES, 4, 4), None);
    }

    #[test]
    fn test_no_context_tokens() {
        assert_eq!(char_span_to_token_span(&[(0, 0), (0, 0)], &[0, 1], 0, 2), None);
    }
}

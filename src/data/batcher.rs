// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implements Burn's Batcher trait to stack encoded examples
// into tensors.
//
// Every example is already padded to max_len, so batching is
// a flatten + reshape:
//   [s1_t1, ..., s1_tL, s2_t1, ..., sN_tL] → [N, L]
//
// Burn's Int tensors are built from i32 here, which is wide
// enough for any vocabulary or label id.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::qa_record::EncodedQaExample;
use crate::domain::tagging::EncodedTaggingExample;

/// Flatten equal-length rows into a [rows, width] Int tensor.
fn stack<'a, B: Backend>(
    rows: impl Iterator<Item = &'a Vec<i64>>,
    batch_size: usize,
    width: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let flat: Vec<i32> = rows.flat_map(|r| r.iter().map(|&x| x as i32)).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch_size, width])
}

// ─── Tagging ──────────────────────────────────────────────────────────────────
/// A batch of tagging examples. Every tensor is [batch_size, max_len].
#[derive(Debug, Clone)]
pub struct TaggingBatch<B: Backend> {
    pub ids: Tensor<B, 2, Int>,
    /// 1 = real token, 0 = padding
    pub mask: Tensor<B, 2, Int>,
    pub token_type_ids: Tensor<B, 2, Int>,
    pub target_pos: Tensor<B, 2, Int>,
    pub target_tag: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TaggingBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TaggingBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<EncodedTaggingExample, TaggingBatch<B>> for TaggingBatcher<B> {
    fn batch(&self, items: Vec<EncodedTaggingExample>) -> TaggingBatch<B> {
        let n = items.len();
        let width = items.first().map(|e| e.ids.len()).unwrap_or(0);

        TaggingBatch {
            ids: stack(items.iter().map(|e| &e.ids), n, width, &self.device),
            mask: stack(items.iter().map(|e| &e.mask), n, width, &self.device),
            token_type_ids: stack(items.iter().map(|e| &e.token_type_ids), n, width, &self.device),
            target_pos: stack(items.iter().map(|e| &e.target_pos), n, width, &self.device),
            target_tag: stack(items.iter().map(|e| &e.target_tag), n, width, &self.device),
        }
    }
}

// ─── QA ───────────────────────────────────────────────────────────────────────
/// A batch of QA examples for the span head.
#[derive(Debug, Clone)]
pub struct QaBatch<B: Backend> {
    /// [batch_size, max_len]
    pub input_ids: Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
    pub token_type_ids: Tensor<B, 2, Int>,
    /// [batch_size] — one start / end token index per example
    pub start_positions: Tensor<B, 1, Int>,
    pub end_positions: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct QaBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> QaBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<EncodedQaExample, QaBatch<B>> for QaBatcher<B> {
    fn batch(&self, items: Vec<EncodedQaExample>) -> QaBatch<B> {
        let n = items.len();
        let width = items.first().map(|e| e.ids.len()).unwrap_or(0);

        let starts: Vec<i32> = items.iter().map(|e| e.start_position as i32).collect();
        let ends: Vec<i32> = items.iter().map(|e| e.end_position as i32).collect();

        QaBatch {
            input_ids: stack(items.iter().map(|e| &e.ids), n, width, &self.device),
            attention_mask: stack(items.iter().map(|e| &e.mask), n, width, &self.device),
            token_type_ids: stack(items.iter().map(|e| &e.token_type_ids), n, width, &self.device),
            start_positions: Tensor::<B, 1, Int>::from_ints(starts.as_slice(), &self.device),
            end_positions: Tensor::<B, 1, Int>::from_ints(ends.as_slice(), &self.device),
        }
    }
}

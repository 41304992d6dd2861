// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Burn model and training code. The data layer only touches
// Burn through its Dataset/Batcher traits; everything with
// parameters lives here.
//
//   model.rs     — shared transformer encoder (token, position
//                  and segment embeddings, padded self-attention)
//                  with a two-head tagging model and a span QA
//                  model on top
//
//   trainer.rs   — epoch loops: forward, loss, backward, AdamW
//                  step, validation accuracy, metrics CSV and
//                  best-validation-loss checkpointing

/// Transformer encoder and task heads
pub mod model;

/// Training loops with validation and checkpointing
pub mod trainer;

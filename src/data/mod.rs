// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a raw annotation and a tensor batch.
//
// Tagging:
//
//   tagging CSV
//       │
//       ▼
//   tagging_corpus    → sentences + POS/TAG vocabularies
//       │
//       ▼
//   expander          → one label per subword token
//       │
//       ▼
//   framer            → [CLS] … [SEP], truncate, pad, mask
//       │
//       ▼
//   TaggingDataset    → Burn Dataset, encodes on access
//       │
//       ▼
//   TaggingBatcher    → [batch, max_len] tensors
//
// Question answering:
//
//   SQuAD JSON ─▶ squad (flatten + span_corrector) ─▶ qa_cache
//       │
//       ▼
//   qa_encoder        → encode_plus, offset_mapper, framer
//       │
//       ▼
//   QaDataset / QaBatcher
//
// Each module is responsible for exactly one step and is
// unit tested on its own.

/// Word labels → subword labels
pub mod expander;

/// Sentinels, truncation and padding to a fixed width
pub mod framer;

/// Off-by-N answer offset correction
pub mod span_corrector;

/// Character span → token span over an offset mapping
pub mod offset_mapper;

/// Sentence → five parallel fixed-width arrays
pub mod tagging_encoder;

/// QA record → ids, mask, segment ids, start/end token
pub mod qa_encoder;

/// Word-per-row tagging CSV loader
pub mod tagging_corpus;

/// SQuAD flattening, per-record skipping and correction report
pub mod squad;

/// Hash-validated CSV cache of prepared QA corpora
pub mod qa_cache;

/// Implements Burn's Dataset trait for both tasks
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded shuffle-and-split into train/validation sets
pub mod splitter;

#[cfg(test)]
pub(crate) mod test_support;

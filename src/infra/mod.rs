// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the application and ml
// layers but owned by neither:
//
//   hf_tokenizer.rs    — TokenizerAdapter over a HuggingFace
//                        tokenizer (character offsets, fixed
//                        [CLS]/[SEP] framing)
//
//   tokenizer_store.rs — loads tokenizer.json, or builds a
//                        WordPiece vocabulary from the corpus
//
//   checkpoint.rs      — best-epoch weights via CompactRecorder
//                        plus JSON sidecars (config, label
//                        vocabularies)
//
//   metrics.rs         — per-epoch CSV log

/// HuggingFace tokenizer behind the domain TokenizerAdapter
pub mod hf_tokenizer;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works with:
// annotated sentences, QA records, label vocabularies, and the
// tokenizer contract.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums, traits and their invariants
//
// Everything here is unit testable without a tokenizer file
// or a GPU.

/// Typed errors for the domain and data layers
pub mod error;

/// Annotated sentences and their encoded form
pub mod tagging;

/// Flattened QA records with character-offset answer spans
pub mod qa_record;

/// Immutable label <-> id mapping with 0 reserved for padding
pub mod label_vocab;

/// The tokenizer contract the data layer depends on
pub mod traits;

// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
//
//   prepare_use_case  — SQuAD JSON → corrected, cached records
//   tagging_use_case  — CSV corpus → trained POS/TAG tagger
//   qa_use_case       — prepared corpora → trained span model
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

/// Encoder size and tokenizer source shared by both tasks
pub mod model_params;

/// The QA corpus preparation workflow
pub mod prepare_use_case;

/// The tagging training workflow
pub mod tagging_use_case;

/// The span QA training workflow
pub mod qa_use_case;

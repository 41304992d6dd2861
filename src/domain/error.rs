// ============================================================
// Layer 3 — Data Errors
// ============================================================
// Typed failures raised by the domain and data layers.
//
// The application and CLI layers wrap these in anyhow::Error
// with extra context; everything below them returns DataResult
// so callers can match on the exact failure.
//
// Per-record annotation defects (a malformed SQuAD entry, an
// answer that cannot be re-aligned) are NOT errors — they are
// reported through SkipReason / Alignment instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("length mismatch in {context}: {expected} words but {actual} labels")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("max_len must leave room for both sentinel tokens (>= 2), got {0}")]
    InvalidMaxLen(usize),
    #[error("tokenizer failed on {input:?}: {message}")]
    Tokenizer { input: String, message: String },
    #[error("unknown label {label:?} in the {vocabulary} vocabulary")]
    UnknownLabel { vocabulary: String, label: String },
    #[error("label {label:?} appears twice in the {vocabulary} vocabulary")]
    DuplicateLabel { vocabulary: String, label: String },
    #[error("missing column {0:?}")]
    MissingColumn(&'static str),
    #[error("malformed corpus: {0}")]
    MalformedCorpus(String),
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("CSV error while {context}: {source}")]
    Csv {
        context: &'static str,
        #[source]
        source: csv::Error,
    },
}

impl DataError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn csv(context: &'static str, source: csv::Error) -> Self {
        Self::Csv { context, source }
    }

    pub(crate) fn tokenizer(input: &str, err: impl std::fmt::Display) -> Self {
        Self::Tokenizer {
            input: input.to_string(),
            message: err.to_string(),
        }
    }
}

pub type DataResult<T> = Result<T, DataError>;

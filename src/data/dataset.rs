use burn::data::dataset::Dataset;

use crate::data::qa_encoder::QaEncoder;
use crate::data::tagging_encoder::TaggingEncoder;
use crate::domain::qa_record::{EncodedQaExample, QaRecord};
use crate::domain::tagging::{EncodedTaggingExample, TaggedSentence};

/// Annotated sentences, encoded on every access.
/// Nothing is cached across epochs: `get(i)` always re-runs
/// expansion and framing for sentence i.
pub struct TaggingDataset {
    sentences: Vec<TaggedSentence>,
    encoder: TaggingEncoder,
}

impl TaggingDataset {
    pub fn new(sentences: Vec<TaggedSentence>, encoder: TaggingEncoder) -> Self {
        Self { sentences, encoder }
    }
}

impl Dataset<EncodedTaggingExample> for TaggingDataset {
    // Burn's Dataset::get cannot return an error, and a sentence
    // that fails to encode means the whole corpus is broken, so
    // fail loudly instead of handing the loader a short batch.
    fn get(&self, index: usize) -> Option<EncodedTaggingExample> {
        let sentence = self.sentences.get(index)?;
        match self.encoder.encode(sentence) {
            Ok(example) => Some(example),
            Err(e) => panic!("failed to encode tagging example {index}: {e}"),
        }
    }

    fn len(&self) -> usize {
        self.sentences.len()
    }
}

/// QA records, encoded on every access.
pub struct QaDataset {
    records: Vec<QaRecord>,
    encoder: QaEncoder,
}

impl QaDataset {
    pub fn new(records: Vec<QaRecord>, encoder: QaEncoder) -> Self {
        Self { records, encoder }
    }
}

impl Dataset<EncodedQaExample> for QaDataset {
    fn get(&self, index: usize) -> Option<EncodedQaExample> {
        let record = self.records.get(index)?;
        match self.encoder.encode(record) {
            Ok(example) => Some(example),
            Err(e) => panic!("failed to encode QA example {index} ({}): {e}", record.id),
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

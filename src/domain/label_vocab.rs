// ============================================================
// Layer 3 — Label Vocabulary
// ============================================================
// A bijective mapping between label strings ("B-geo", "NNP")
// and small integer ids, built ONCE over the whole corpus and
// then shared read-only by the train and validation datasets.
//
// Id 0 is reserved: it is the value used for padding and for
// the [CLS]/[SEP] sentinel positions, so real labels are
// numbered from 1 in sorted order.
//
//   labels: ["B-geo", "I-geo", "O"]
//   ids:    [   1,       2,     3 ]

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::error::{DataError, DataResult};

/// Id shared by padding, sentinels and "no label".
pub const PAD_LABEL_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct LabelVocabulary {
    name: String,
    labels: Vec<String>,
    index: HashMap<String, i64>,
}

/// On-disk form — the index is rebuilt on load.
#[derive(Clone, Serialize, Deserialize)]
struct VocabularyRepr {
    name: String,
    labels: Vec<String>,
}

impl TryFrom<VocabularyRepr> for LabelVocabulary {
    type Error = DataError;

    /// A hand-edited file must still describe a bijection.
    fn try_from(repr: VocabularyRepr) -> DataResult<Self> {
        let mut seen = HashSet::with_capacity(repr.labels.len());
        for label in &repr.labels {
            if !seen.insert(label.as_str()) {
                return Err(DataError::DuplicateLabel {
                    vocabulary: repr.name.clone(),
                    label: label.clone(),
                });
            }
        }
        Ok(Self::from_labels(repr.name, repr.labels))
    }
}

impl From<LabelVocabulary> for VocabularyRepr {
    fn from(vocab: LabelVocabulary) -> Self {
        Self {
            name: vocab.name,
            labels: vocab.labels,
        }
    }
}

impl LabelVocabulary {
    /// Build from every label occurrence in the corpus.
    /// Duplicates collapse; order is lexicographic so the same
    /// corpus always yields the same ids.
    pub fn build<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect();
        Self::from_labels(name.into(), unique.into_iter().collect())
    }

    /// Ids follow `labels` order; callers guarantee uniqueness.
    fn from_labels(name: String, labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), PAD_LABEL_ID + 1 + i as i64))
            .collect();
        Self {
            name,
            labels,
            index,
        }
    }

    pub fn id(&self, label: &str) -> Option<i64> {
        self.index.get(label).copied()
    }

    /// Like `id`, but an unseen label is an error.
    pub fn encode(&self, label: &str) -> DataResult<i64> {
        self.id(label).ok_or_else(|| DataError::UnknownLabel {
            vocabulary: self.name.clone(),
            label: label.to_string(),
        })
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> DataResult<Vec<i64>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Number of real labels (excluding the reserved 0).
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Output width a classifier head needs: real labels + padding.
    pub fn num_classes(&self) -> usize {
        self.labels.len() + 1
    }
}

// ============================================================
// Layer 2 — PrepareQaUseCase
// ============================================================
// Turns SQuAD JSON files into corrected, flat QA corpora:
//
//   Step 1: Read the source bytes and fingerprint them  (data)
//   Step 2: Reuse the cache if it was built from them   (data)
//   Step 3: Otherwise flatten + correct in parallel     (data)
//   Step 4: Write the cache for next time               (data)
//
// The training file yields one record per answer; the optional
// evaluation file yields one record per question with every
// reference answer attached.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::data::{
    qa_cache::{source_fingerprint, EvalRow, QaCache, TrainRow},
    squad::{parse_squad, prepare_eval, prepare_train, PreparationReport, PrepareOptions},
};
use crate::domain::{
    error::DataResult,
    qa_record::{QaEvalRecord, QaRecord},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareQaConfig {
    pub train_file: String,
    pub eval_file: Option<String>,
    pub cache_dir: String,
    pub drop_unresolved: bool,
}

impl Default for PrepareQaConfig {
    fn default() -> Self {
        Self {
            train_file: "data/train-v1.1.json".to_string(),
            eval_file: Some("data/dev-v1.1.json".to_string()),
            cache_dir: "data/cache".to_string(),
            drop_unresolved: false,
        }
    }
}

impl PrepareQaConfig {
    fn options(&self) -> PrepareOptions {
        PrepareOptions {
            drop_unresolved: self.drop_unresolved,
        }
    }
}

pub struct PreparedCorpus<T> {
    pub records: Vec<T>,
    pub report: PreparationReport,
}

pub struct PreparedQa {
    pub train: PreparedCorpus<QaRecord>,
    pub eval: Option<PreparedCorpus<QaEvalRecord>>,
}

pub struct PrepareQaUseCase {
    config: PrepareQaConfig,
}

impl PrepareQaUseCase {
    pub fn new(config: PrepareQaConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PreparedQa> {
        let cfg = &self.config;
        let options = cfg.options();

        let train = prepare_cached(
            Path::new(&cfg.train_file),
            "train",
            &cfg.cache_dir,
            options,
            prepare_train,
            |records| Ok(records.iter().map(TrainRow::from).collect()),
            QaRecord::try_from,
        )?;

        let eval = match &cfg.eval_file {
            Some(path) => Some(prepare_cached(
                Path::new(path),
                "eval",
                &cfg.cache_dir,
                options,
                prepare_eval,
                |records| records.iter().map(EvalRow::try_from).collect(),
                QaEvalRecord::try_from,
            )?),
            None => None,
        };

        Ok(PreparedQa { train, eval })
    }
}

/// Shared cache-or-build flow for both corpus kinds. The cache
/// is named `<kind>-<file stem>` so one file can serve as both.
fn prepare_cached<T, Row>(
    source: &Path,
    kind: &str,
    cache_dir: &str,
    options: PrepareOptions,
    prepare: fn(&Value, PrepareOptions) -> DataResult<(Vec<T>, PreparationReport)>,
    to_rows: impl Fn(&[T]) -> DataResult<Vec<Row>>,
    from_row: impl Fn(Row) -> DataResult<T>,
) -> Result<PreparedCorpus<T>>
where
    Row: Serialize + DeserializeOwned,
{
    let bytes = fs::read(source)
        .with_context(|| format!("Cannot read QA corpus '{}'", source.display()))?;
    let hash = source_fingerprint(&bytes);

    let name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("QA corpus path '{}' has no file name", source.display()))?;
    let cache = QaCache::new(cache_dir, &format!("{kind}-{name}"));

    if let Some((rows, report)) = cache.load_if_fresh::<Row>(hash, options)? {
        let records = rows
            .into_iter()
            .map(&from_row)
            .collect::<DataResult<Vec<T>>>()?;
        return Ok(PreparedCorpus { records, report });
    }

    tracing::info!("Preparing QA corpus from '{}'", source.display());
    let root = parse_squad(&bytes)
        .with_context(|| format!("Malformed SQuAD file '{}'", source.display()))?;
    let (records, report) = prepare(&root, options)?;

    cache
        .store(&to_rows(&records)?, hash, options, &report)
        .with_context(|| format!("Cannot write cache '{}'", cache.csv_path().display()))?;

    Ok(PreparedCorpus { records, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::qa_record::Alignment;

    const SQUAD: &str = r#"{
        "data": [{
            "paragraphs": [{
                "context": "The cat sat on the mat.",
                "qas": [
                    { "id": "q1", "question": "Who sat?",
                      "answers": [{ "text": "cat sat", "answer_start": 5 }] },
                    { "id": "q2", "question": "Where?",
                      "answers": [{ "text": "the dog", "answer_start": 0 }] },
                    { "id": "q3", "question": "Broken?" }
                ]
            }]
        }]
    }"#;

    fn config(dir: &Path, drop_unresolved: bool) -> PrepareQaConfig {
        let train = dir.join("train.json");
        fs::write(&train, SQUAD).unwrap();
        PrepareQaConfig {
            train_file: train.to_string_lossy().into_owned(),
            eval_file: Some(train.to_string_lossy().into_owned()),
            cache_dir: dir.join("cache").to_string_lossy().into_owned(),
            drop_unresolved,
        }
    }

    #[test]
    fn test_prepares_then_reuses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), false);

        let first = PrepareQaUseCase::new(cfg.clone()).execute().unwrap();
        assert!(!first.train.report.from_cache);
        assert_eq!(first.train.records.len(), 2);
        assert_eq!(first.train.report.skipped, 1);

        let q1 = &first.train.records[0];
        assert_eq!(q1.answer.alignment, Alignment::Shifted(1));
        assert_eq!((q1.answer.answer_start, q1.answer.answer_end), (4, 11));

        let second = PrepareQaUseCase::new(cfg).execute().unwrap();
        assert!(second.train.report.from_cache);
        assert_eq!(second.train.records, first.train.records);
        let eval = second.eval.unwrap();
        assert_eq!(eval.records.len(), 2);
        assert!(eval.report.from_cache);
    }

    #[test]
    fn test_drop_unresolved_rebuilds_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        PrepareQaUseCase::new(config(dir.path(), false)).execute().unwrap();

        let strict = PrepareQaUseCase::new(config(dir.path(), true)).execute().unwrap();
        assert!(!strict.train.report.from_cache);
        assert_eq!(strict.train.records.len(), 1);
        assert_eq!(strict.train.report.dropped_unresolved, 1);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PrepareQaConfig {
            train_file: dir.path().join("absent.json").to_string_lossy().into_owned(),
            eval_file: None,
            cache_dir: dir.path().to_string_lossy().into_owned(),
            drop_unresolved: false,
        };
        assert!(PrepareQaUseCase::new(cfg).execute().is_err());
    }
}

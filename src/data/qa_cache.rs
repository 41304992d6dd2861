// ============================================================
// Layer 4 — Prepared QA Corpus Cache
// ============================================================
// Flattening and correcting a large SQuAD file is a one-time
// step, so the prepared corpus is written to a flat CSV next to
// a small JSON sidecar:
//
//   cache/
//     train.csv         ← one row per prepared record
//     train.meta.json   ← source hash + settings + report
//
// The cache is reused ONLY when the xxh64 hash of the source
// JSON bytes and the preparation settings both match. Editing
// the source file (or switching --drop-unresolved) therefore
// always triggers a rebuild; the mere existence of the CSV is
// never enough.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::data::squad::{PrepareOptions, PreparationReport};
use crate::domain::error::{DataError, DataResult};
use crate::domain::qa_record::{Alignment, AnswerSpan, QaEvalRecord, QaRecord};

/// Content fingerprint of a source corpus.
pub fn source_fingerprint(bytes: &[u8]) -> u64 {
    xxh64(bytes, 0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheMeta {
    source_hash: u64,
    options: PrepareOptions,
    report: PreparationReport,
}

// ─── Row formats ──────────────────────────────────────────────────────────────
/// Flat CSV row for training records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRow {
    pub id: String,
    pub question: String,
    pub context: String,
    pub answer: String,
    pub answer_start: usize,
    pub answer_end: usize,
    pub c_id: usize,
    pub alignment: String,
}

/// Flat CSV row for evaluation records; `answers` holds JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRow {
    pub id: String,
    pub question: String,
    pub context: String,
    pub answers: String,
    pub c_id: usize,
}

impl From<&QaRecord> for TrainRow {
    fn from(r: &QaRecord) -> Self {
        Self {
            id: r.id.clone(),
            question: r.question.clone(),
            context: r.context.clone(),
            answer: r.answer.text.clone(),
            answer_start: r.answer.answer_start,
            answer_end: r.answer.answer_end,
            c_id: r.context_id,
            alignment: r.answer.alignment.to_string(),
        }
    }
}

impl TryFrom<TrainRow> for QaRecord {
    type Error = DataError;

    fn try_from(row: TrainRow) -> DataResult<Self> {
        let alignment: Alignment = row
            .alignment
            .parse()
            .map_err(|e: String| DataError::MalformedCorpus(format!("cached row {}: {e}", row.id)))?;
        Ok(QaRecord {
            id: row.id,
            question: row.question,
            context: row.context,
            context_id: row.c_id,
            answer: AnswerSpan {
                text: row.answer,
                answer_start: row.answer_start,
                answer_end: row.answer_end,
                alignment,
            },
        })
    }
}

impl TryFrom<&QaEvalRecord> for EvalRow {
    type Error = DataError;

    fn try_from(r: &QaEvalRecord) -> DataResult<Self> {
        Ok(Self {
            id: r.id.clone(),
            question: r.question.clone(),
            context: r.context.clone(),
            answers: serde_json::to_string(&r.answers)
                .map_err(|e| DataError::json("serialising cached answers", e))?,
            c_id: r.context_id,
        })
    }
}

impl TryFrom<EvalRow> for QaEvalRecord {
    type Error = DataError;

    fn try_from(row: EvalRow) -> DataResult<Self> {
        Ok(QaEvalRecord {
            answers: serde_json::from_str(&row.answers)
                .map_err(|e| DataError::json("reading cached answers", e))?,
            id: row.id,
            question: row.question,
            context: row.context,
            context_id: row.c_id,
        })
    }
}

// ─── QaCache ──────────────────────────────────────────────────────────────────
pub struct QaCache {
    csv_path: PathBuf,
    meta_path: PathBuf,
}

impl QaCache {
    /// A cache named `name` inside `dir` (e.g. "train", "valid").
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            csv_path: dir.join(format!("{name}.csv")),
            meta_path: dir.join(format!("{name}.meta.json")),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Cached rows and their report, if the cache was built from
    /// exactly this source with exactly these options.
    pub fn load_if_fresh<T: DeserializeOwned>(
        &self,
        source_hash: u64,
        options: PrepareOptions,
    ) -> DataResult<Option<(Vec<T>, PreparationReport)>> {
        if !self.meta_path.exists() || !self.csv_path.exists() {
            return Ok(None);
        }

        let meta_json = fs::read_to_string(&self.meta_path)
            .map_err(|e| DataError::io("reading cache metadata", e))?;
        let meta: CacheMeta = match serde_json::from_str(&meta_json) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache metadata '{}': {}", self.meta_path.display(), e);
                return Ok(None);
            }
        };

        if meta.source_hash != source_hash || meta.options != options {
            tracing::info!(
                "Cache '{}' is stale (source or settings changed), rebuilding",
                self.csv_path.display()
            );
            return Ok(None);
        }

        let mut rdr = csv::Reader::from_path(&self.csv_path)
            .map_err(|e| DataError::csv("opening cached corpus", e))?;
        let rows = rdr
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| DataError::csv("reading cached corpus", e))?;

        let mut report = meta.report;
        report.from_cache = true;
        tracing::info!("Loaded {} cached rows from '{}'", rows.len(), self.csv_path.display());
        Ok(Some((rows, report)))
    }

    /// Write rows first, metadata last, so a crash mid-write
    /// leaves a cache that is never considered fresh.
    pub fn store<T: Serialize>(
        &self,
        rows: &[T],
        source_hash: u64,
        options: PrepareOptions,
        report: &PreparationReport,
    ) -> DataResult<()> {
        if let Some(parent) = self.csv_path.parent() {
            fs::create_dir_all(parent).map_err(|e| DataError::io("creating cache directory", e))?;
        }
        if self.meta_path.exists() {
            fs::remove_file(&self.meta_path).map_err(|e| DataError::io("removing stale cache metadata", e))?;
        }

        let mut wtr = csv::Writer::from_path(&self.csv_path)
            .map_err(|e| DataError::csv("creating cached corpus", e))?;
        for row in rows {
            wtr.serialize(row)
                .map_err(|e| DataError::csv("writing cached corpus", e))?;
        }
        wtr.flush().map_err(|e| DataError::io("flushing cached corpus", e))?;

        let meta = CacheMeta {
            source_hash,
            options,
            report: report.clone(),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::json("serialising cache metadata", e))?;
        fs::write(&self.meta_path, json).map_err(|e| DataError::io("writing cache metadata", e))?;

        tracing::debug!("Cached {} rows at '{}'", rows.len(), self.csv_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, alignment: Alignment) -> QaRecord {
        QaRecord {
            id: id.into(),
            question: "Who, \"exactly\", sat?".into(),
            context: "The cat sat,\non the mat.".into(),
            context_id: 2,
            answer: AnswerSpan {
                text: "cat".into(),
                answer_start: 4,
                answer_end: 7,
                alignment,
            },
        }
    }

    #[test]
    fn test_fresh_cache_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QaCache::new(dir.path(), "train");
        let records = vec![record("a", Alignment::Exact), record("b", Alignment::Shifted(2))];
        let rows: Vec<TrainRow> = records.iter().map(TrainRow::from).collect();
        let report = PreparationReport {
            records: 2,
            ..PreparationReport::default()
        };

        cache.store(&rows, 7, PrepareOptions::default(), &report).unwrap();
        let (loaded, cached_report) = cache
            .load_if_fresh::<TrainRow>(7, PrepareOptions::default())
            .unwrap()
            .unwrap();

        let back: Vec<QaRecord> = loaded
            .into_iter()
            .map(QaRecord::try_from)
            .collect::<DataResult<_>>()
            .unwrap();
        assert_eq!(back, records);
        assert!(cached_report.from_cache);
        assert_eq!(cached_report.records, 2);
    }

    #[test]
    fn test_changed_source_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QaCache::new(dir.path(), "train");
        let rows = vec![TrainRow::from(&record("a", Alignment::Exact))];
        let hash = source_fingerprint(b"{\"data\": []}");
        cache
            .store(&rows, hash, PrepareOptions::default(), &PreparationReport::default())
            .unwrap();

        let edited = source_fingerprint(b"{\"data\": [ ]}");
        assert_ne!(hash, edited);
        assert!(cache
            .load_if_fresh::<TrainRow>(edited, PrepareOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_changed_options_invalidate_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QaCache::new(dir.path(), "train");
        cache
            .store::<TrainRow>(&[], 1, PrepareOptions::default(), &PreparationReport::default())
            .unwrap();
        let strict = PrepareOptions {
            drop_unresolved: true,
        };
        assert!(cache.load_if_fresh::<TrainRow>(1, strict).unwrap().is_none());
    }

    #[test]
    fn test_missing_cache_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = QaCache::new(dir.path(), "valid");
        assert!(cache
            .load_if_fresh::<EvalRow>(0, PrepareOptions::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_eval_rows_keep_answer_lists() {
        let rec = QaEvalRecord {
            id: "q".into(),
            question: "?".into(),
            context: "The cat sat".into(),
            context_id: 0,
            answers: vec![AnswerSpan::annotated("cat", 4), AnswerSpan::annotated("sat", 8)],
        };
        let row = EvalRow::try_from(&rec).unwrap();
        assert_eq!(QaEvalRecord::try_from(row).unwrap(), rec);
    }
}

// ============================================================
// Layer 2 — TrainQaUseCase
// ============================================================
// Orchestrates span-QA training:
//
//   Step 1: Prepare train/eval corpora (cache-aware)  (Layer 2)
//   Step 2: Build / load tokenizer                    (Layer 6)
//   Step 3: Pick validation records                   (Layer 4)
//   Step 4: Build datasets                            (Layer 4)
//   Step 5: Save config                               (Layer 6)
//   Step 6: Run training loop                         (Layer 5)
//
// Validation uses the evaluation file when one is given (first
// reference answer per question); otherwise the training
// records are split.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::application::{
    model_params::ModelParams,
    prepare_use_case::{PrepareQaConfig, PrepareQaUseCase, PreparedQa},
};
use crate::data::{
    dataset::QaDataset, framer::SequenceFramer, qa_encoder::QaEncoder, splitter::split_train_val,
};
use crate::domain::qa_record::QaRecord;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::QaModelConfig,
    trainer::{run_qa_training, TrainingSettings, TrainingSummary},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaTrainConfig {
    pub prepare: PrepareQaConfig,
    pub artifact_dir: String,
    /// Used only when there is no evaluation file.
    pub train_fraction: f64,
    pub model: ModelParams,
    pub training: TrainingSettings,
}

impl Default for QaTrainConfig {
    fn default() -> Self {
        Self {
            prepare: PrepareQaConfig::default(),
            artifact_dir: "artifacts/qa".to_string(),
            train_fraction: 0.9,
            model: ModelParams::with_max_seq_len(384),
            training: TrainingSettings {
                batch_size: 8,
                epochs: 2,
                lr: 3e-5,
                seed: 42,
                num_workers: 1,
            },
        }
    }
}

pub struct TrainQaUseCase {
    config: QaTrainConfig,
}

impl TrainQaUseCase {
    pub fn new(config: QaTrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Corpora ───────────────────────────────────────────────────
        let prepared = PrepareQaUseCase::new(cfg.prepare.clone()).execute()?;
        tracing::info!("Training corpus: {}", prepared.train.report);

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let (tokenizer, vocab) = cfg
            .model
            .tokenizer(&cfg.artifact_dir, || corpus_texts(&prepared))?;

        // ── Step 3: Train / validation records ───────────────────────────────
        let (train, valid) = validation_split(prepared, cfg.train_fraction, cfg.training.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), valid.len());
        ensure!(
            !train.is_empty() && !valid.is_empty(),
            "Need at least one training and one validation record (got {} / {})",
            train.len(),
            valid.len()
        );

        // ── Step 4: Datasets ──────────────────────────────────────────────────
        let encoder = QaEncoder::new(tokenizer, SequenceFramer::new(cfg.model.max_seq_len)?);
        let train_dataset = QaDataset::new(train, encoder.clone());
        let valid_dataset = QaDataset::new(valid, encoder);

        // ── Step 5: Artifacts ─────────────────────────────────────────────────
        let model_cfg = QaModelConfig::new(cfg.model.encoder_config(vocab));
        let ckpt = CheckpointManager::new(cfg.artifact_dir.clone())?;
        ckpt.save_json("config.json", cfg)?;
        ckpt.save_json("model_config.json", &model_cfg)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        run_qa_training(&cfg.training, &model_cfg, train_dataset, valid_dataset, &ckpt)
    }
}

/// One string per distinct context plus every question.
fn corpus_texts(prepared: &PreparedQa) -> Vec<String> {
    let mut texts = Vec::new();
    let mut last_context = None;
    for r in &prepared.train.records {
        if last_context != Some(r.context_id) {
            texts.push(r.context.clone());
            last_context = Some(r.context_id);
        }
        texts.push(r.question.clone());
    }
    texts
}

fn validation_split(
    prepared: PreparedQa,
    train_fraction: f64,
    seed: u64,
) -> (Vec<QaRecord>, Vec<QaRecord>) {
    match prepared.eval {
        Some(eval) => {
            let valid = eval.records.iter().map(|r| r.primary_record()).collect();
            (prepared.train.records, valid)
        }
        None => split_train_val(prepared.train.records, train_fraction, seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prepare_use_case::PreparedCorpus;
    use crate::data::squad::PreparationReport;
    use crate::domain::qa_record::{AnswerSpan, QaEvalRecord};

    fn record(id: &str, context_id: usize) -> QaRecord {
        QaRecord {
            id: id.into(),
            question: format!("question {id}"),
            context: format!("context {context_id}"),
            context_id,
            answer: AnswerSpan::annotated("context", 0),
        }
    }

    fn prepared(eval: Option<Vec<QaEvalRecord>>) -> PreparedQa {
        PreparedQa {
            train: PreparedCorpus {
                records: (0..10).map(|i| record(&i.to_string(), i / 3)).collect(),
                report: PreparationReport::default(),
            },
            eval: eval.map(|records| PreparedCorpus {
                records,
                report: PreparationReport::default(),
            }),
        }
    }

    #[test]
    fn test_eval_file_becomes_validation_set() {
        let eval = vec![QaEvalRecord {
            id: "e".into(),
            question: "?".into(),
            context: "context".into(),
            context_id: 0,
            answers: vec![AnswerSpan::annotated("context", 0), AnswerSpan::annotated("text", 3)],
        }];
        let (train, valid) = validation_split(prepared(Some(eval)), 0.9, 42);
        assert_eq!(train.len(), 10);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].answer.text, "context");
    }

    #[test]
    fn test_without_eval_file_training_records_are_split() {
        let (train, valid) = validation_split(prepared(None), 0.8, 42);
        assert_eq!(train.len() + valid.len(), 10);
        assert_eq!(valid.len(), 2);
    }

    #[test]
    fn test_corpus_texts_list_each_context_once() {
        let texts = corpus_texts(&prepared(None));
        // 4 contexts + 10 questions
        assert_eq!(texts.len(), 14);
        assert_eq!(texts.iter().filter(|t| t.starts_with("context")).count(), 4);
    }
}

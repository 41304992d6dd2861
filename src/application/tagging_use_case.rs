// ============================================================
// Layer 2 — TrainTaggerUseCase
// ============================================================
// Orchestrates the tagging training pipeline in order:
//
//   Step 1: Load the word-per-row CSV      (Layer 4 - data)
//   Step 2: Build POS/TAG vocabularies     (Layer 4 - data)
//   Step 3: Build / load tokenizer         (Layer 6 - infra)
//   Step 4: Split train/validation         (Layer 4 - data)
//   Step 5: Build datasets                 (Layer 4 - data)
//   Step 6: Save config + vocabularies     (Layer 6 - infra)
//   Step 7: Run training loop              (Layer 5 - ml)

use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::model_params::ModelParams;
use crate::data::{
    dataset::TaggingDataset,
    framer::SequenceFramer,
    splitter::split_train_val,
    tagging_corpus::{load_tagging_csv, TaggingCorpus},
    tagging_encoder::TaggingEncoder,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    model::TaggingModelConfig,
    trainer::{run_tagging_training, TrainingSettings, TrainingSummary},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingTrainConfig {
    pub data_file: String,
    pub artifact_dir: String,
    pub train_fraction: f64,
    pub model: ModelParams,
    pub training: TrainingSettings,
}

impl Default for TaggingTrainConfig {
    fn default() -> Self {
        Self {
            data_file: "data/ner_dataset.csv".to_string(),
            artifact_dir: "artifacts/tagger".to_string(),
            train_fraction: 0.9,
            model: ModelParams::with_max_seq_len(128),
            training: TrainingSettings {
                batch_size: 32,
                epochs: 10,
                lr: 3e-5,
                seed: 42,
                num_workers: 1,
            },
        }
    }
}

pub struct TrainTaggerUseCase {
    config: TaggingTrainConfig,
}

impl TrainTaggerUseCase {
    pub fn new(config: TaggingTrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1-2: Corpus and vocabularies ────────────────────────────────
        tracing::info!("Loading tagging corpus from '{}'", cfg.data_file);
        let raw = load_tagging_csv(Path::new(&cfg.data_file))
            .with_context(|| format!("Cannot load tagging corpus '{}'", cfg.data_file))?;
        let corpus = TaggingCorpus::from_raw(&raw)?;
        ensure!(!corpus.sentences.is_empty(), "Tagging corpus '{}' has no sentences", cfg.data_file);

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        let (tokenizer, vocab) = cfg.model.tokenizer(&cfg.artifact_dir, || corpus.texts())?;

        // ── Step 4: Split ─────────────────────────────────────────────────────
        let (train, valid) =
            split_train_val(corpus.sentences.clone(), cfg.train_fraction, cfg.training.seed);
        tracing::info!("Split: {} train, {} validation", train.len(), valid.len());
        ensure!(
            !train.is_empty() && !valid.is_empty(),
            "Need at least one training and one validation sentence (got {} / {})",
            train.len(),
            valid.len()
        );

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        // Both splits share the tokenizer and the vocabularies
        // built over the whole corpus.
        let encoder = TaggingEncoder::new(tokenizer, SequenceFramer::new(cfg.model.max_seq_len)?);
        let train_dataset = TaggingDataset::new(train, encoder.clone());
        let valid_dataset = TaggingDataset::new(valid, encoder);

        // ── Step 6: Artifacts needed to rebuild the model ─────────────────────
        let model_cfg = TaggingModelConfig::new(
            cfg.model.encoder_config(vocab),
            corpus.pos_vocab.num_classes(),
            corpus.tag_vocab.num_classes(),
        );
        let ckpt = CheckpointManager::new(cfg.artifact_dir.clone())?;
        ckpt.save_json("config.json", cfg)?;
        ckpt.save_json("model_config.json", &model_cfg)?;
        ckpt.save_json("pos_vocab.json", &corpus.pos_vocab)?;
        ckpt.save_json("tag_vocab.json", &corpus.tag_vocab)?;

        // ── Step 7: Train ─────────────────────────────────────────────────────
        run_tagging_training(&cfg.training, &model_cfg, train_dataset, valid_dataset, &ckpt)
    }
}

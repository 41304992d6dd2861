// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands:
//
//   prepare-qa    — flatten + correct SQuAD files, fill the cache
//   train-tagger  — train the POS/TAG token classifier
//   train-qa      — train the span QA model
//
// Each args struct converts into its application config via
// `From`, so the application layer never sees clap types.

use clap::{Args, Subcommand};

use crate::application::{
    model_params::ModelParams,
    prepare_use_case::PrepareQaConfig,
    qa_use_case::QaTrainConfig,
    tagging_use_case::TaggingTrainConfig,
};
use crate::ml::trainer::TrainingSettings;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Flatten and re-align a SQuAD-style corpus, writing the cache
    PrepareQa(PrepareArgs),

    /// Train the two-head POS/entity tagger on a word-per-row CSV
    TrainTagger(TrainTaggerArgs),

    /// Train the span-prediction QA model
    TrainQa(TrainQaArgs),
}

/// Flags shared by `prepare-qa` and `train-qa`.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// SQuAD-style training JSON
    #[arg(long, default_value = "data/train-v1.1.json")]
    pub train_file: String,

    /// SQuAD-style evaluation JSON (one record per question)
    #[arg(long)]
    pub eval_file: Option<String>,

    /// Where the prepared CSV caches are written
    #[arg(long, default_value = "data/cache")]
    pub cache_dir: String,

    /// Exclude answers whose offsets cannot be re-aligned
    /// instead of keeping them flagged as unresolved
    #[arg(long)]
    pub drop_unresolved: bool,
}

/// Encoder and training-loop flags shared by both trainers.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Maximum tokens per framed sequence, sentinels included
    #[arg(long)]
    pub max_seq_len: Option<usize>,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    #[arg(long, default_value_t = 3e-5)]
    pub lr: f64,

    /// Seed for the train/validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Hidden size; must be divisible by --num-heads
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Vocabulary budget when building a tokenizer from the corpus
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Pretrained tokenizer.json (e.g. bert-base-cased); built
    /// from the corpus when omitted
    #[arg(long)]
    pub tokenizer: Option<String>,
}

impl ModelArgs {
    fn model_params(&self, default_max_seq_len: usize) -> ModelParams {
        ModelParams {
            max_seq_len: self.max_seq_len.unwrap_or(default_max_seq_len),
            d_model: self.d_model,
            num_heads: self.num_heads,
            num_layers: self.num_layers,
            d_ff: self.d_ff,
            dropout: self.dropout,
            vocab_size: self.vocab_size,
            tokenizer_file: self.tokenizer.clone(),
        }
    }

    fn training(&self) -> TrainingSettings {
        TrainingSettings {
            batch_size: self.batch_size,
            epochs: self.epochs,
            lr: self.lr,
            seed: self.seed,
            num_workers: self.num_workers,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainTaggerArgs {
    /// CSV with columns `Sentence #, Word, POS, Tag`
    #[arg(long, default_value = "data/ner_dataset.csv")]
    pub data_file: String,

    /// Directory for checkpoints, tokenizer, vocabularies, metrics
    #[arg(long, default_value = "artifacts/tagger")]
    pub artifact_dir: String,

    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Args, Debug)]
pub struct TrainQaArgs {
    #[command(flatten)]
    pub prepare: PrepareArgs,

    #[arg(long, default_value = "artifacts/qa")]
    pub artifact_dir: String,

    /// Used only when no --eval-file is given
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<PrepareArgs> for PrepareQaConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareQaConfig {
            train_file: a.train_file,
            eval_file: a.eval_file,
            cache_dir: a.cache_dir,
            drop_unresolved: a.drop_unresolved,
        }
    }
}

impl From<TrainTaggerArgs> for TaggingTrainConfig {
    fn from(a: TrainTaggerArgs) -> Self {
        TaggingTrainConfig {
            model: a.model.model_params(128),
            training: a.model.training(),
            data_file: a.data_file,
            artifact_dir: a.artifact_dir,
            train_fraction: a.train_fraction,
        }
    }
}

impl From<TrainQaArgs> for QaTrainConfig {
    fn from(a: TrainQaArgs) -> Self {
        QaTrainConfig {
            model: a.model.model_params(384),
            training: a.model.training(),
            prepare: a.prepare.into(),
            artifact_dir: a.artifact_dir,
            train_fraction: a.train_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_tagger_defaults_use_short_sequences() {
        let cli = Cli::parse_from(["bert-span-align", "train-tagger", "--epochs", "3"]);
        let Commands::TrainTagger(args) = cli.command else {
            panic!("expected train-tagger");
        };
        let cfg: TaggingTrainConfig = args.into();
        assert_eq!(cfg.model.max_seq_len, 128);
        assert_eq!(cfg.training.epochs, 3);
        assert_eq!(cfg.training.seed, 42);
    }

    #[test]
    fn test_qa_args_flatten_prepare_flags() {
        let cli = Cli::parse_from([
            "bert-span-align",
            "train-qa",
            "--train-file",
            "t.json",
            "--eval-file",
            "d.json",
            "--drop-unresolved",
            "--max-seq-len",
            "256",
        ]);
        let Commands::TrainQa(args) = cli.command else {
            panic!("expected train-qa");
        };
        let cfg: QaTrainConfig = args.into();
        assert_eq!(cfg.prepare.train_file, "t.json");
        assert_eq!(cfg.prepare.eval_file.as_deref(), Some("d.json"));
        assert!(cfg.prepare.drop_unresolved);
        assert_eq!(cfg.model.max_seq_len, 256);
    }
}

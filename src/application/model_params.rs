// ============================================================
// Layer 2 — Shared Run Parameters
// ============================================================
// Encoder size and tokenizer source, shared by both training
// use cases and saved as part of each run's config.json.

use std::{path::Path, sync::Arc};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::traits::TokenizerAdapter;
use crate::infra::{hf_tokenizer::HfTokenizer, tokenizer_store::TokenizerStore};
use crate::ml::model::EncoderConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    pub max_seq_len: usize,
    pub d_model: usize,
    pub num_heads: usize,
    pub num_layers: usize,
    pub d_ff: usize,
    pub dropout: f64,
    /// Upper bound when building a tokenizer from the corpus.
    pub vocab_size: usize,
    /// Pretrained tokenizer.json; built from the corpus if absent.
    pub tokenizer_file: Option<String>,
}

impl ModelParams {
    pub fn with_max_seq_len(max_seq_len: usize) -> Self {
        Self {
            max_seq_len,
            d_model: 256,
            num_heads: 8,
            num_layers: 6,
            d_ff: 1024,
            dropout: 0.1,
            vocab_size: 30522,
            tokenizer_file: None,
        }
    }

    /// Embedding rows come from the tokenizer actually in use,
    /// not from the requested `vocab_size`.
    pub fn encoder_config(&self, tokenizer_vocab: usize) -> EncoderConfig {
        EncoderConfig::new(
            tokenizer_vocab,
            self.max_seq_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
        )
        .with_dropout(self.dropout)
    }

    /// Load the configured tokenizer, or the one stored in
    /// `artifact_dir`, building it from `texts` the first time.
    pub fn tokenizer(
        &self,
        artifact_dir: &str,
        texts: impl FnOnce() -> Vec<String>,
    ) -> Result<(Arc<dyn TokenizerAdapter>, usize)> {
        let tokenizer = match &self.tokenizer_file {
            Some(path) => {
                tracing::info!("Using pretrained tokenizer '{}'", path);
                HfTokenizer::from_file(Path::new(path))?
            }
            None => {
                let store = TokenizerStore::new(artifact_dir);
                if store.path().exists() {
                    store.load()?
                } else {
                    store.load_or_build(&texts(), self.vocab_size)?
                }
            }
        };
        let vocab = tokenizer.vocab_size();
        tracing::info!("Tokenizer vocabulary: {} entries", vocab);
        Ok((Arc::new(tokenizer), vocab))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_config_uses_tokenizer_vocab() {
        let params = ModelParams::with_max_seq_len(128);
        let cfg = params.encoder_config(5000);
        assert_eq!(cfg.vocab_size, 5000);
        assert_eq!(cfg.max_seq_len, 128);
        assert_eq!(cfg.d_model % cfg.num_heads, 0);
    }

    #[test]
    fn test_tokenizer_built_once_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = dir.path().to_string_lossy().into_owned();
        let params = ModelParams::with_max_seq_len(16);

        let (tok, vocab) = params
            .tokenizer(&artifacts, || vec!["the cat sat".to_string()])
            .unwrap();
        assert!(vocab > 103);
        assert_eq!(tok.encode("cat", false).unwrap().len(), 1);

        let (_, again) = params
            .tokenizer(&artifacts, || panic!("corpus must not be re-read"))
            .unwrap();
        assert_eq!(again, vocab);
    }
}

// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// plus the JSON sidecars needed to rebuild a model later.
//
// Only the best epoch (lowest validation loss) is kept:
//
//   artifacts/
//     model_epoch_3.mpk.gz   ← best weights so far
//     best_epoch.json        ← {"epoch": 3, "valid_loss": 0.41}
//     config.json            ← run configuration
//     pos_vocab.json         ← label vocabularies (tagging only)
//     tag_vocab.json
//
// A newer best replaces the previous weight file, so the
// directory never holds more than one checkpoint.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestEpoch {
    pub epoch: usize,
    pub valid_loss: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create artifact directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn weights_path(&self, epoch: usize) -> PathBuf {
        // The recorder appends .mpk.gz itself.
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Record `model` as the new best and drop the previous best.
    pub fn save_best<B: Backend, M: Module<B>>(&self, model: &M, best: BestEpoch) -> Result<()> {
        let previous = self.best_epoch().ok();

        let path = self.weights_path(best.epoch);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        self.save_json("best_epoch.json", &best)?;

        if let Some(prev) = previous.filter(|p| p.epoch != best.epoch) {
            let stale = self.weights_path(prev.epoch).with_extension("mpk.gz");
            if let Err(e) = fs::remove_file(&stale) {
                tracing::warn!("Could not remove old checkpoint '{}': {}", stale.display(), e);
            }
        }

        tracing::debug!(
            "Saved best checkpoint: epoch {} (valid_loss={:.4})",
            best.epoch,
            best.valid_loss
        );
        Ok(())
    }

    /// Load the best saved weights into `model`, which must have
    /// the same architecture as the one that was saved.
    pub fn load_best<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let best = self.best_epoch()?;
        let path = self.weights_path(best.epoch);
        tracing::info!("Loading checkpoint from epoch {}", best.epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    pub fn best_epoch(&self) -> Result<BestEpoch> {
        self.load_json("best_epoch.json")
            .with_context(|| "No best checkpoint recorded yet")
    }

    pub fn save_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    pub fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json =
            fs::read_to_string(&path).with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::{Linear, LinearConfig};

    use crate::domain::label_vocab::LabelVocabulary;

    type TestBackend = NdArray;

    fn weights(linear: &Linear<TestBackend>) -> Vec<f32> {
        linear.weight.val().into_data().convert::<f32>().to_vec().unwrap()
    }

    #[test]
    fn test_best_checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        let device = Default::default();

        let trained: Linear<TestBackend> = LinearConfig::new(4, 3).init(&device);
        mgr.save_best(&trained, BestEpoch { epoch: 2, valid_loss: 0.5 }).unwrap();

        let fresh: Linear<TestBackend> = LinearConfig::new(4, 3).init(&device);
        let restored = mgr.load_best(fresh, &device).unwrap();

        // Half precision on disk.
        for (a, b) in weights(&trained).iter().zip(weights(&restored)) {
            assert!((a - b).abs() < 1e-2);
        }
        assert_eq!(mgr.best_epoch().unwrap().epoch, 2);
    }

    #[test]
    fn test_new_best_replaces_old_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        let model: Linear<TestBackend> = LinearConfig::new(2, 2).init(&Default::default());

        mgr.save_best(&model, BestEpoch { epoch: 1, valid_loss: 1.0 }).unwrap();
        mgr.save_best(&model, BestEpoch { epoch: 3, valid_loss: 0.7 }).unwrap();

        assert!(!dir.path().join("model_epoch_1.mpk.gz").exists());
        assert!(dir.path().join("model_epoch_3.mpk.gz").exists());
        assert_eq!(mgr.best_epoch().unwrap(), BestEpoch { epoch: 3, valid_loss: 0.7 });
    }

    #[test]
    fn test_missing_best_epoch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        assert!(mgr.best_epoch().is_err());
    }

    #[test]
    fn test_vocabulary_sidecar_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        let vocab = LabelVocabulary::build("tag", ["O", "B-geo", "I-geo"]);

        mgr.save_json("tag_vocab.json", &vocab).unwrap();
        let back: LabelVocabulary = mgr.load_json("tag_vocab.json").unwrap();
        assert_eq!(back, vocab);
    }
}

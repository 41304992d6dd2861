// ============================================================
// Layer 5 — Training Loops
// ============================================================
// Train + validation loops for both tasks, using Burn's
// DataLoader, AdamW and a linear learning-rate decay.
//
//   - Training runs on Autodiff<Wgpu>
//   - model.valid() returns the model on the inner Wgpu backend
//     (dropout off), so the validation batcher uses it too
//   - argmax(dim) keeps the reduced dim; flatten before .equal()
//
// After every epoch one metrics row is appended and, if the
// validation loss improved, the checkpoint is replaced. The
// best checkpoint is reloaded once training ends.

use anyhow::Result;
use burn::{
    backend::wgpu::WgpuDevice,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    lr_scheduler::{
        linear::{LinearLrScheduler, LinearLrSchedulerConfig},
        LrScheduler,
    },
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{QaBatcher, TaggingBatcher},
    dataset::{QaDataset, TaggingDataset},
};
use crate::infra::{
    checkpoint::{BestEpoch, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{QaModel, QaModelConfig, TaggingModel, TaggingModelConfig};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Decoupled weight decay. Burn applies it to every parameter,
/// biases and norm scales included.
const WEIGHT_DECAY: f32 = 1e-3;

/// Loop settings shared by both tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub batch_size: usize,
    pub epochs: usize,
    pub lr: f64,
    pub seed: u64,
    pub num_workers: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub best: Option<BestEpoch>,
    /// Parameter count of the reloaded best checkpoint.
    pub restored_params: Option<usize>,
}

#[derive(Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            f64::NAN
        }
    }
}

fn ratio(hits: usize, total: usize) -> f64 {
    if total > 0 {
        hits as f64 / total as f64
    } else {
        0.0
    }
}

/// (correct, counted) over tokens whose target is not padding.
fn token_hits<B: Backend>(logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> (usize, usize) {
    let [batch_size, seq_len, _] = logits.dims();
    let predicted = logits.argmax(2).reshape([batch_size, seq_len]);
    let real = targets.clone().equal_elem(0).bool_not().int();

    let correct: i64 = predicted
        .equal(targets)
        .int()
        .mul(real.clone())
        .sum()
        .into_scalar()
        .elem::<i64>();
    let counted: i64 = real.sum().into_scalar().elem::<i64>();
    (correct as usize, counted as usize)
}

/// Examples whose arg-max position equals the target.
fn position_hits<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}

fn record_epoch<M: Module<MyBackend>>(
    model: &M,
    metrics: EpochMetrics,
    best: &mut Option<BestEpoch>,
    logger: &MetricsLogger,
    ckpt: &CheckpointManager,
) -> Result<()> {
    logger.log(&metrics)?;

    let best_loss = best.map(|b| b.valid_loss).unwrap_or(f64::INFINITY);
    if metrics.is_improvement(best_loss) {
        let new_best = BestEpoch {
            epoch: metrics.epoch,
            valid_loss: metrics.valid_loss,
        };
        ckpt.save_best::<MyBackend, M>(model, new_best)?;
        *best = Some(new_best);
        tracing::info!("New best checkpoint at epoch {}", metrics.epoch);
    }
    Ok(())
}

fn optimizer_config() -> AdamWConfig {
    AdamWConfig::new()
        .with_epsilon(1e-8)
        .with_weight_decay(WEIGHT_DECAY)
}

/// Optimizer steps in a whole run; the last batch may be short.
fn total_steps(train_len: usize, batch_size: usize, epochs: usize) -> usize {
    (train_len.div_ceil(batch_size.max(1)) * epochs).max(1)
}

/// Linear decay from `settings.lr` to zero over the whole run.
fn lr_schedule(settings: &TrainingSettings, train_len: usize) -> Result<LinearLrScheduler> {
    let steps = total_steps(train_len, settings.batch_size, settings.epochs);
    LinearLrSchedulerConfig::new(settings.lr, 0.0, steps)
        .init()
        .map_err(|e| anyhow::anyhow!("Invalid learning-rate schedule: {e}"))
}

/// Reload the best weights on the inference backend, so a run
/// only reports a checkpoint that is known to load back.
fn restore_best<B: Backend, M: Module<B>>(
    ckpt: &CheckpointManager,
    best: Option<BestEpoch>,
    fresh: M,
    device: &B::Device,
) -> Result<Option<usize>> {
    if best.is_none() {
        return Ok(None);
    }
    let restored = ckpt.load_best::<B, M>(fresh, device)?;
    Ok(Some(restored.num_params()))
}

fn device() -> WgpuDevice {
    let device = WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    device
}

// ─── Tagging ──────────────────────────────────────────────────────────────────
pub fn run_tagging_training(
    settings: &TrainingSettings,
    model_cfg: &TaggingModelConfig,
    train_dataset: TaggingDataset,
    valid_dataset: TaggingDataset,
    ckpt: &CheckpointManager,
) -> Result<TrainingSummary> {
    let device = device();

    let mut model: TaggingModel<MyBackend> = model_cfg.init(&device);
    tracing::info!(
        "Tagging model ready: {} layers, d_model={}, {} POS / {} TAG classes",
        model_cfg.encoder.num_layers,
        model_cfg.encoder.d_model,
        model_cfg.num_pos,
        model_cfg.num_tag
    );
    let mut optim = optimizer_config().init();
    let mut scheduler = lr_schedule(settings, train_dataset.len())?;

    let train_loader = DataLoaderBuilder::new(TaggingBatcher::<MyBackend>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(settings.num_workers)
        .build(train_dataset);
    let valid_loader = DataLoaderBuilder::new(TaggingBatcher::<MyInnerBackend>::new(device.clone()))
        .batch_size(settings.batch_size)
        .num_workers(settings.num_workers)
        .build(valid_dataset);

    let logger = MetricsLogger::new(ckpt.dir(), "metrics.csv", ["pos_acc", "tag_acc"])?;
    let mut best = None;

    for epoch in 1..=settings.epochs {
        let mut train_loss = RunningMean::default();
        for batch in train_loader.iter() {
            let output = model.forward(batch.ids, batch.token_type_ids, batch.mask);
            let loss = model.loss(&output, batch.target_pos, batch.target_tag);
            train_loss.add(loss.clone().into_scalar().elem::<f64>());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(scheduler.step(), model, grads);
        }

        let model_valid = model.valid();
        let mut valid_loss = RunningMean::default();
        let (mut pos_hits, mut tag_hits, mut tokens) = (0usize, 0usize, 0usize);

        for batch in valid_loader.iter() {
            let output = model_valid.forward(batch.ids, batch.token_type_ids, batch.mask);
            let loss = model_valid.loss(&output, batch.target_pos.clone(), batch.target_tag.clone());
            valid_loss.add(loss.into_scalar().elem::<f64>());

            let (p, counted) = token_hits(output.pos_logits, batch.target_pos);
            let (t, _) = token_hits(output.tag_logits, batch.target_tag);
            pos_hits += p;
            tag_hits += t;
            tokens += counted;
        }

        let metrics = EpochMetrics {
            epoch,
            train_loss: train_loss.mean(),
            valid_loss: valid_loss.mean(),
            first_acc: ratio(pos_hits, tokens),
            second_acc: ratio(tag_hits, tokens),
        };
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | valid_loss={:.4} | pos_acc={:.1}% | tag_acc={:.1}%",
            epoch,
            settings.epochs,
            metrics.train_loss,
            metrics.valid_loss,
            metrics.first_acc * 100.0,
            metrics.second_acc * 100.0,
        );
        record_epoch(&model, metrics, &mut best, &logger, ckpt)?;
    }

    tracing::info!("Tagging training complete");
    let restored_params = restore_best(ckpt, best, model_cfg.init::<MyInnerBackend>(&device), &device)?;
    Ok(TrainingSummary {
        epochs: settings.epochs,
        best,
        restored_params,
    })
}

// ─── QA ───────────────────────────────────────────────────────────────────────
pub fn run_qa_training(
    settings: &TrainingSettings,
    model_cfg: &QaModelConfig,
    train_dataset: QaDataset,
    valid_dataset: QaDataset,
    ckpt: &CheckpointManager,
) -> Result<TrainingSummary> {
    let device = device();

    let mut model: QaModel<MyBackend> = model_cfg.init(&device);
    tracing::info!(
        "QA model ready: {} layers, d_model={}",
        model_cfg.encoder.num_layers,
        model_cfg.encoder.d_model
    );
    let mut optim = optimizer_config().init();
    let mut scheduler = lr_schedule(settings, train_dataset.len())?;

    let train_loader = DataLoaderBuilder::new(QaBatcher::<MyBackend>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(settings.num_workers)
        .build(train_dataset);
    let valid_loader = DataLoaderBuilder::new(QaBatcher::<MyInnerBackend>::new(device.clone()))
        .batch_size(settings.batch_size)
        .num_workers(settings.num_workers)
        .build(valid_dataset);

    let logger = MetricsLogger::new(ckpt.dir(), "metrics.csv", ["start_acc", "end_acc"])?;
    let mut best = None;

    for epoch in 1..=settings.epochs {
        let mut train_loss = RunningMean::default();
        for batch in train_loader.iter() {
            let output = model.forward(batch.input_ids, batch.token_type_ids, batch.attention_mask);
            let loss = model.loss(&output, batch.start_positions, batch.end_positions);
            train_loss.add(loss.clone().into_scalar().elem::<f64>());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(scheduler.step(), model, grads);
        }

        let model_valid = model.valid();
        let mut valid_loss = RunningMean::default();
        let (mut start_hits, mut end_hits, mut examples) = (0usize, 0usize, 0usize);

        for batch in valid_loader.iter() {
            let output =
                model_valid.forward(batch.input_ids, batch.token_type_ids, batch.attention_mask);
            let loss = model_valid.loss(
                &output,
                batch.start_positions.clone(),
                batch.end_positions.clone(),
            );
            valid_loss.add(loss.into_scalar().elem::<f64>());

            examples += batch.start_positions.dims()[0];
            start_hits += position_hits(output.start_logits, batch.start_positions);
            end_hits += position_hits(output.end_logits, batch.end_positions);
        }

        let metrics = EpochMetrics {
            epoch,
            train_loss: train_loss.mean(),
            valid_loss: valid_loss.mean(),
            first_acc: ratio(start_hits, examples),
            second_acc: ratio(end_hits, examples),
        };
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | valid_loss={:.4} | start_acc={:.1}% | end_acc={:.1}%",
            epoch,
            settings.epochs,
            metrics.train_loss,
            metrics.valid_loss,
            metrics.first_acc * 100.0,
            metrics.second_acc * 100.0,
        );
        record_epoch(&model, metrics, &mut best, &logger, ckpt)?;
    }

    tracing::info!("QA training complete");
    let restored_params = restore_best(ckpt, best, model_cfg.init::<MyInnerBackend>(&device), &device)?;
    Ok(TrainingSummary {
        epochs: settings.epochs,
        best,
        restored_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_token_hits_skip_padding_targets() {
        let device = Default::default();
        // Predictions (argmax over last dim): [1, 2, 0, 1]
        let logits = Tensor::<TestBackend, 3>::from_floats(
            [[[0.0, 5.0, 0.0], [0.0, 0.0, 5.0], [5.0, 0.0, 0.0], [0.0, 5.0, 0.0]]],
            &device,
        );
        let targets = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 0, 0]], &device);
        assert_eq!(token_hits(logits, targets), (1, 2));
    }

    #[test]
    fn test_position_hits() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.0, 3.0, 1.0], [2.0, 0.0, 1.0]], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1, 2], &device);
        assert_eq!(position_hits(logits, targets), 1);
    }

    #[test]
    fn test_running_mean_and_ratio() {
        let mut m = RunningMean::default();
        assert!(m.mean().is_nan());
        m.add(1.0);
        m.add(3.0);
        assert_eq!(m.mean(), 2.0);
        assert_eq!(ratio(1, 4), 0.25);
        assert_eq!(ratio(0, 0), 0.0);
    }

    #[test]
    fn test_total_steps_counts_short_last_batch() {
        assert_eq!(total_steps(10, 4, 2), 6);
        assert_eq!(total_steps(8, 4, 1), 2);
        assert_eq!(total_steps(0, 4, 3), 1);
    }

    #[test]
    fn test_learning_rate_decays_linearly_to_zero() {
        let settings = TrainingSettings {
            batch_size: 2,
            epochs: 2,
            lr: 1e-3,
            seed: 42,
            num_workers: 1,
        };
        let mut scheduler = lr_schedule(&settings, 4).unwrap();
        let rates: Vec<f64> = (0..4).map(|_| scheduler.step()).collect();

        assert!(rates.iter().all(|&lr| (0.0..=1e-3).contains(&lr)));
        assert!(rates.windows(2).all(|w| w[1] <= w[0]));
        assert!(rates[3] < rates[0]);
    }

    #[test]
    fn test_restore_best_reloads_saved_weights() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        let device = Default::default();
        let linear = || burn::nn::LinearConfig::new(2, 2).init::<TestBackend>(&device);

        assert_eq!(restore_best(&ckpt, None, linear(), &device).unwrap(), None);

        let best = BestEpoch {
            epoch: 1,
            valid_loss: 0.5,
        };
        ckpt.save_best::<TestBackend, _>(&linear(), best).unwrap();
        assert_eq!(restore_best(&ckpt, Some(best), linear(), &device).unwrap(), Some(6));
    }
}

// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch. Both tasks share the layout;
// only the names of the two accuracy columns differ:
//
//   tagging:  epoch,train_loss,valid_loss,pos_acc,tag_acc
//   qa:       epoch,train_loss,valid_loss,start_acc,end_acc
//
// Accuracies are over real tokens only (tagging) or over
// examples (qa), in [0.0, 1.0].

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub valid_loss: f64,
    pub first_acc: f64,
    pub second_acc: f64,
}

impl EpochMetrics {
    pub fn is_improvement(&self, best_valid_loss: f64) -> bool {
        self.valid_loss < best_valid_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header only if the file doesn't exist yet, so
    /// repeated runs append to the same log.
    pub fn new(dir: &Path, file_name: &str, acc_columns: [&str; 2]) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;
        let csv_path = dir.join(file_name);

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,valid_loss,{},{}", acc_columns[0], acc_columns[1])?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.valid_loss, m.first_acc, m.second_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, valid_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.valid_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, valid_loss: f64) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 2.5,
            valid_loss,
            first_acc: 0.25,
            second_acc: 0.5,
        }
    }

    #[test]
    fn test_is_improvement() {
        let m = metrics(2, 2.3);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
        assert!(!m.is_improvement(2.3));
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), "metrics.csv", ["pos_acc", "tag_acc"]).unwrap();
        logger.log(&metrics(1, 3.0)).unwrap();

        let again = MetricsLogger::new(dir.path(), "metrics.csv", ["pos_acc", "tag_acc"]).unwrap();
        again.log(&metrics(2, 2.0)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,valid_loss,pos_acc,tag_acc");
        assert_eq!(lines[2], "2,2.500000,2.000000,0.250000,0.500000");
    }
}

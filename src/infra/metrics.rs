// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch so a run can be analysed (or
// plotted) after the fact without scraping stdout:
//
//   checkpoints/metrics.csv
//   epoch,train_loss,val_loss,val_mae,direction_acc
//   1,0.012450,0.013892,0.091230,0.518000
//   2,0.008901,0.011543,0.084300,0.552000
//
// The header is written once; a rerun against the same
// checkpoint directory keeps appending to the same file.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// Everything measured in one training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number, starting at 1
    pub epoch: usize,

    /// Mean MSE over the epoch's training batches
    pub train_loss: f64,

    /// Per-window MSE on the validation set; divergence from
    /// train_loss indicates overfitting
    pub val_loss: f64,

    /// Per-window mean absolute error, in movement units
    pub val_mae: f64,

    /// Fraction of validation windows scored with the correct
    /// sign; 0.5 is coin-flip level
    pub direction_acc: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:         usize,
        train_loss:    f64,
        val_loss:      f64,
        val_mae:       f64,
        direction_acc: f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, val_mae, direction_acc }
    }

    /// Whether this epoch beats the best validation loss so far.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Writes epoch rows to `<dir>/metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or start) the metrics file under `dir`.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            fs::write(&csv_path, "epoch,train_loss,val_loss,val_mae,direction_acc\n")
                .with_context(|| {
                    format!("Cannot start metrics file '{}'", csv_path.display())
                })?;
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let row = format!(
            "{},{:.6},{:.6},{:.6},{:.6}\n",
            m.epoch, m.train_loss, m.val_loss, m.val_mae, m.direction_acc,
        );

        OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .and_then(|mut f| f.write_all(row.as_bytes()))
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        tracing::debug!("Epoch {} metrics logged", m.epoch);
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn improvement_means_strictly_lower_val_loss() {
        let m = EpochMetrics::new(2, 0.010, 0.012, 0.08, 0.55);
        assert!(m.is_improvement(0.020));
        // Ties don't count
        assert!(!m.is_improvement(0.012));
    }

    #[test]
    fn rows_accumulate_under_one_header() {
        let dir = std::env::temp_dir().join("tweet_stock_han_metrics_test");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.to_string_lossy().to_string();

        let logger = MetricsLogger::new(path.clone()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.02, 0.03, 0.1, 0.5)).unwrap();

        // A second logger on the same directory appends, not truncates
        MetricsLogger::new(path).unwrap()
            .log(&EpochMetrics::new(2, 0.01, 0.02, 0.09, 0.54)).unwrap();

        let content = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("epoch,"));
        assert!(lines[1].starts_with("1,"));
        assert!(lines[2].starts_with("2,"));

        let _ = fs::remove_dir_all(&dir);
    }
}

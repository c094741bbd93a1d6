// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// One directory holds everything a training run produces:
//
//   checkpoints/
//     model_epoch_{n}.mpk.gz  ← hierarchical model, one per epoch
//     encoder.mpk.gz          ← post-encoder weights
//     latest_epoch.json       ← which epoch inference should load
//     train_config.json       ← architecture + loop hyperparameters
//
// Weights go through Burn's CompactRecorder; the .mpk.gz suffix
// is the recorder's, paths are handed over extensionless. The
// encoder record doubles as the "pretrained model" the config
// names: when the directory already holds one, training reuses
// it unchanged, otherwise a fresh encoder is recorded at
// startup.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde_json;

use crate::application::train_use_case::TrainConfig;
use crate::ml::encoder::TransformerPostEncoder;
use crate::ml::model::HanModel;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Record the hierarchical model after `epoch` and move the
    /// latest-epoch pointer onto it.
    pub fn save_model<B: AutodiffBackend>(
        &self,
        model: &HanModel<B>,
        epoch: usize,
    ) -> Result<()> {
        let path = self.epoch_path(epoch);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        fs::write(
            self.dir.join("latest_epoch.json"),
            serde_json::to_string(&epoch)?,
        )
        .context("Failed to write latest_epoch.json")?;

        tracing::debug!("Checkpoint recorded for epoch {}", epoch);
        Ok(())
    }

    /// Restore the newest recorded weights into `model`, which
    /// must already carry the recorded architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  HanModel<B>,
        device: &B::Device,
    ) -> Result<HanModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.epoch_path(epoch);

        tracing::info!("Loading model weights from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}' — has a train run completed?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Record the post-encoder weights. Called once at training
    /// startup, and again per epoch only when a trainable suffix
    /// is configured.
    pub fn save_encoder<B: Backend>(&self, encoder: &TransformerPostEncoder<B>) -> Result<()> {
        let path = self.dir.join("encoder");
        CompactRecorder::new()
            .record(encoder.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save encoder weights to '{}'", path.display())
            })?;

        tracing::debug!("Encoder weights recorded");
        Ok(())
    }

    /// True when an encoder record already exists here.
    pub fn has_encoder(&self) -> bool {
        self.dir.join("encoder.mpk.gz").exists()
    }

    /// Restore the encoder weights recorded for this run.
    pub fn load_encoder<B: Backend>(
        &self,
        encoder: TransformerPostEncoder<B>,
        device:  &B::Device,
    ) -> Result<TransformerPostEncoder<B>> {
        let path = self.dir.join("encoder");

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load encoder weights '{}'. Have you trained first?",
                    path.display())
            })?;

        Ok(encoder.load_record(record))
    }

    /// Write the training configuration as JSON. Must happen
    /// before the loop starts so a crashed run still leaves the
    /// predictor enough to rebuild the architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Training config saved to '{}'", path.display());
        Ok(())
    }

    /// Read back the training configuration the predictor uses to
    /// rebuild the recorded architecture.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'predict'.",
                    path.display()
                )
            })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// The epoch number the latest-epoch pointer names.
    fn latest_epoch(&self) -> Result<usize> {
        let s = fs::read_to_string(self.dir.join("latest_epoch.json"))
            .context("Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

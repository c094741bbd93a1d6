// ============================================================
// Layer 5 — Movement Predictor
// ============================================================
// Rebuilds the trained encoder + hierarchical model from a
// checkpoint directory and scores single windows. Runs on the
// plain Wgpu backend — no autodiff, dropout fixed at 0.0, so
// the same window always produces the same score.

use anyhow::Result;
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::batcher::WindowBatcher;
use crate::data::dataset::WindowSample;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::encoder::{PostEncoderConfig, TransformerPostEncoder};
use crate::ml::model::{forward_window, HanConfig, HanModel};

type InferBackend = burn::backend::Wgpu;

pub struct MovementPredictor {
    encoder: TransformerPostEncoder<InferBackend>,
    model:   HanModel<InferBackend>,
    device:  burn::backend::wgpu::WgpuDevice,
}

impl MovementPredictor {
    /// Restore the stack recorded by the last training run.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        let cfg    = ckpt_manager.load_config()?;

        let enc_cfg = PostEncoderConfig::new(
            cfg.vocab_size, cfg.max_tokens, cfg.embedding_dim,
            cfg.num_heads, cfg.num_layers, cfg.d_ff, 0.0,
        );
        let encoder = ckpt_manager.load_encoder(enc_cfg.init(&device), &device)?;

        let han_cfg = HanConfig::new(
            cfg.embedding_dim, cfg.gru_dim, cfg.hidden_size,
            cfg.days, cfg.posts_per_day, 0.0,
        );
        let model = ckpt_manager.load_model(han_cfg.init(&device), &device)?;

        tracing::info!("Predictor ready (weights from checkpoint)");
        Ok(Self { encoder, model, device })
    }

    /// Score one encoded window. Positive means the movement is
    /// expected to be up, negative down.
    pub fn score(&self, sample: &WindowSample) -> Result<f32> {
        // The batcher assembles inference tensors exactly like training ones
        let batch = WindowBatcher::<InferBackend>::new(self.device.clone())
            .batch(vec![sample.clone()]);

        let scores = forward_window(&self.encoder, &self.model, batch.windows);
        let score: f32 = scores.into_scalar().elem::<f32>();

        // Non-finite scores are an error, never a result
        if !score.is_finite() {
            anyhow::bail!(
                "Model produced a non-finite score ({score}) — checkpoint or input data is corrupt"
            );
        }

        tracing::debug!("Window scored: {:+.5}", score);
        Ok(score)
    }
}

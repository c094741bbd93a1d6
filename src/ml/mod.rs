// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the model-side Burn code. The data layer
// implements Burn's Dataset/Batcher traits; everything else
// Burn-specific lives here.
//
// Why isolate the model code here?
//   - If Burn's API changes, we only update this layer
//   - Other layers are testable without a GPU
//   - The model architecture is clearly separated from
//     data loading and application logic
//
// What's in this layer:
//
//   encoder.rs   — The frozen post encoder
//                  BERT-style transformer with:
//                  • Token / segment / position embeddings
//                  • Multi-head self-attention
//                  • Feed-forward networks (GELU activation)
//                  • Layer normalisation + residuals
//                  • [CLS] pooling into one vector per post
//
//   gru.rs       — Bidirectional GRU over the day sequence
//
//   model.rs     — The hierarchical attention network
//                  Post attention → BiGRU → day attention →
//                  regression head producing one score
//
//   trainer.rs   — The training loop
//                  Handles forward pass, MSE loss, backward
//                  pass, optimiser step, and checkpoint
//                  saving per epoch
//
//   predictor.rs — The inference engine
//                  Loads a checkpoint and scores windows
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need
//            Yang et al. (2016) Hierarchical Attention Networks
//
// NOTE on precision: everything runs in f32. Movement values
// are small (daily returns), but well within f32 range.

/// Frozen BERT-style post encoder
pub mod encoder;

/// Bidirectional GRU layer for the day sequence
pub mod gru;

/// Hierarchical attention network architecture
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and scores windows
pub mod predictor;

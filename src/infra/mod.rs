// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs      — Saving and loading model weights
//                        Uses Burn's CompactRecorder to
//                        serialise model parameters to disk.
//                        Also saves/loads TrainConfig as JSON
//                        so inference can rebuild the model,
//                        and keeps the encoder record that
//                        stands in for a pretrained checkpoint.
//
//   tokenizer_store.rs — Tokenizer persistence
//                        Builds a word-level tokenizer from the
//                        post corpus if none exists, or loads a
//                        previously saved one. Ensures the same
//                        vocabulary is used for training and
//                        inference.
//
//   metrics.rs         — Training metrics logging
//                        Writes epoch-level metrics (losses,
//                        MAE, direction accuracy) to a CSV
//                        file for later analysis and plotting.
//
// These concerns serve several layers at once, so they sit in
// one place instead of being duplicated; swapping a file store
// for something remote would touch only this layer.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;

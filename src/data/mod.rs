// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw .jsonl post streams
// all the way to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   .jsonl post streams (one file per ticker)
//       │
//       ▼
//   JsonlPostLoader   → reads posts and movement labels
//       │
//       ▼
//   Preprocessor      → cleans text (whitespace, URLs, mentions)
//       │
//       ▼
//   WindowBuilder     → groups posts by day, slides day windows
//       │
//       ▼
//   WindowTokenizer   → frames and pads posts into ID grids
//       │
//       ▼
//   WindowDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   WindowBatcher     → stacks samples into 5-axis tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
// This makes each step independently testable and replaceable.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Loads .jsonl post streams and their movement labels
pub mod loader;

/// Cleans and normalises raw post text
pub mod preprocessor;

/// Groups posts by day and builds labelled day windows
pub mod windows;

/// Encodes windows into fixed-size token ID grids
pub mod encoding;

/// Implements Burn's Dataset trait for window samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

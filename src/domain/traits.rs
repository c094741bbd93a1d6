// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams other layers implement. The application layer
// programs against these traits, so the concrete loader or
// scorer can be swapped without touching the callers.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::post::PostStream;

// ─── PostSource ───────────────────────────────────────────────────────────────
/// Any component that can load per-ticker post streams.
///
/// Implementations:
///   - JsonlPostLoader → loads from a directory of .jsonl files
pub trait PostSource {
    /// Load all available streams from this source.
    /// Returns one PostStream per ticker, or an error.
    fn load_all(&self) -> Result<Vec<PostStream>>;
}

// ─── MovementScorer ───────────────────────────────────────────────────────────
/// Any component that can score a ticker's most recent window.
///
/// Implementations:
///   - PredictUseCase → uses the trained hierarchical model
pub trait MovementScorer {
    /// Score the latest available window for `ticker`.
    /// Positive scores read as expected upward movement.
    fn score(&self, ticker: &str) -> Result<f32>;
}

// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Scores the most recent day window of one ticker's stream:
//   1. Load the ticker's .jsonl post stream
//   2. Clean the post text (same pass as training)
//   3. Take the latest `days`-long window
//   4. Encode it against the stored tokenizer
//   5. Score it with the checkpointed model

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    encoding::WindowTokenizer,
    loader::JsonlPostLoader,
    preprocessor::Preprocessor,
    windows::WindowBuilder,
};
use crate::domain::traits::{MovementScorer, PostSource};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::predictor::MovementPredictor;

pub struct PredictUseCase {
    data_dir:  String,
    config:    TrainConfig,
    tokenizer: Tokenizer,
    predictor: MovementPredictor,
}

impl PredictUseCase {
    /// Restore everything a scoring run needs from the checkpoint
    /// directory: tokenizer, architecture config, trained weights.
    pub fn new(checkpoint_dir: String, data_dir: String) -> Result<Self> {
        let tok_store = TokenizerStore::new(&checkpoint_dir);
        let tokenizer = tok_store.load()?;
        let ckpt      = CheckpointManager::new(&checkpoint_dir);
        let config    = ckpt.load_config()?;
        let predictor = MovementPredictor::from_checkpoint(&ckpt)?;
        Ok(Self { data_dir, config, tokenizer, predictor })
    }
}

impl MovementScorer for PredictUseCase {
    fn score(&self, ticker: &str) -> Result<f32> {
        // ── Step 1: Load the ticker's stream ─────────────────────────────────
        let loader  = JsonlPostLoader::new(&self.data_dir);
        let streams = loader.load_all()?;
        let mut stream = streams
            .into_iter()
            .find(|s| s.ticker.eq_ignore_ascii_case(ticker))
            .with_context(|| {
                format!("No post stream named '{}' in '{}'", ticker, self.data_dir)
            })?;

        // ── Step 2: Same cleaning pass as training ───────────────────────────
        let prep = Preprocessor::new();
        for post in &mut stream.posts {
            post.text = prep.clean(&post.text);
        }

        // ── Step 3: The most recent window ───────────────────────────────────
        let builder = WindowBuilder::new(self.config.days);
        let window  = builder.latest(&stream).with_context(|| {
            format!(
                "'{}' has fewer than {} observed dates — not enough for one window",
                ticker, self.config.days,
            )
        })?;
        tracing::info!(
            "Scoring {} over {} → {}",
            stream.ticker,
            window.dates[0],
            window.dates[window.dates.len() - 1],
        );

        // ── Step 4: Encode with the training-time tokenizer and geometry ─────
        let window_tok = WindowTokenizer::new(
            &self.tokenizer,
            self.config.max_tokens,
            self.config.posts_per_day,
        );
        let sample = window_tok.encode_window(&window)?;

        // ── Step 5: Run the model ────────────────────────────────────────────
        self.predictor.score(&sample)
    }
}

// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Walks the training pipeline start to finish:
//
//   Step 1: Load .jsonl post streams   (Layer 4 - data)
//   Step 2: Clean the post text        (Layer 4 - data)
//   Step 3: Build labelled windows     (Layer 4 - data)
//   Step 4: Build tokenizer            (Layer 6 - infra)
//   Step 5: Encode windows to samples  (Layer 4 - data)
//   Step 6: Split train/validation     (Layer 4 - data)
//   Step 7: Build datasets             (Layer 4 - data)
//   Step 8: Save config                (Layer 6 - infra)
//   Step 9: Run training loop          (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{WindowDataset, WindowSample},
    encoding::WindowTokenizer,
    loader::JsonlPostLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
    windows::WindowBuilder,
};
use crate::domain::post::{Post, PostStream};
use crate::domain::traits::PostSource;
use crate::domain::window::{LabeledWindow, MovementLabel};
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::TokenizerStore,
};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob a training run exposes, in one serde-serialisable struct.
// The trainer writes it next to the checkpoints, and the predictor
// reads it back to rebuild the exact architecture it was trained with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub checkpoint_dir: String,

    // Window geometry
    pub days:           usize,
    pub posts_per_day:  usize,
    pub max_tokens:     usize,

    // Post encoder architecture
    pub embedding_dim:  usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub vocab_size:     usize,

    /// How many trailing encoder blocks stay trainable.
    /// 0 (the default) freezes the whole encoder.
    pub trainable_encoder_layers: usize,

    // Hierarchical model architecture
    pub gru_dim:        usize,
    pub hidden_size:    usize,
    pub dropout:        f64,

    // Training loop
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub train_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data/streams".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            days:           5,
            posts_per_day:  16,
            max_tokens:     32,
            embedding_dim:  256,
            num_heads:      8,
            num_layers:     4,
            d_ff:           1024,
            vocab_size:     30522,
            trainable_encoder_layers: 0,
            gru_dim:        256,
            hidden_size:    128,
            dropout:        0.1,
            batch_size:     8,
            epochs:         10,
            lr:             2e-4,
            train_fraction: 0.8,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Holds the config and drives the nine steps above.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Wrap a config in a runnable use case.
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run every pipeline step in order; the first error aborts the run.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load all post streams ────────────────────────────────────
        // JsonlPostLoader walks the directory and parses each .jsonl file
        tracing::info!("Loading post streams from '{}'", cfg.data_dir);
        let loader      = JsonlPostLoader::new(&cfg.data_dir);
        let raw_streams = loader.load_all()?;
        tracing::info!("Loaded {} post streams", raw_streams.len());

        // ── Step 2: Clean / normalise post text ──────────────────────────────
        // Removes URLs, @mentions, control characters, extra whitespace
        let preprocessor = Preprocessor::new();
        let mut streams: Vec<PostStream> = raw_streams
            .into_iter()
            .map(|mut s| {
                for post in &mut s.posts {
                    post.text = preprocessor.clean(&post.text);
                }
                s
            })
            .collect();

        // ── Step 3: Build labelled day windows ───────────────────────────────
        // Each stream contributes every window its dates and labels allow
        let builder = WindowBuilder::new(cfg.days);
        let mut windows: Vec<LabeledWindow> = streams
            .iter()
            .flat_map(|s| builder.build(s))
            .collect();

        // No usable data → fall back to a synthetic demo stream so the
        // whole pipeline still runs end to end
        if windows.is_empty() {
            tracing::warn!(
                "No labelled windows in '{}' — generating a synthetic demo stream",
                cfg.data_dir
            );
            let mut demo = build_synthetic_stream();
            for post in &mut demo.posts {
                post.text = preprocessor.clean(&post.text);
            }
            windows = builder.build(&demo);
            streams = vec![demo];
        }
        tracing::info!("Built {} labelled windows", windows.len());

        // ── Step 4: Build / load tokenizer ───────────────────────────────────
        // If a tokenizer was already built and saved, load it. Otherwise
        // build a word-level vocabulary from the cleaned post corpus.
        let corpus: Vec<String> = streams
            .iter()
            .flat_map(|s| s.posts.iter().map(|p| p.text.clone()))
            .collect();
        let tok_store = TokenizerStore::new(&cfg.checkpoint_dir);
        let tokenizer = tok_store.load_or_build(&corpus, cfg.vocab_size)?;

        // ── Step 5: Encode windows into training samples ─────────────────────
        // Fixed-size [days][posts_per_day][max_tokens] grids of token ids,
        // segment ids and attention masks, plus the movement target
        let window_tok = WindowTokenizer::new(&tokenizer, cfg.max_tokens, cfg.posts_per_day);
        let samples: Vec<WindowSample> = windows
            .iter()
            .map(|w| window_tok.encode_window(w))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!("Encoded {} training samples", samples.len());

        // ── Step 6: Train / validation split ─────────────────────────────────
        // Validation windows stay unseen during training
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction);
        tracing::info!(
            "Using {} windows for training, {} for validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 7: Build Burn datasets ──────────────────────────────────────
        // WindowDataset gives Burn's DataLoader indexed access to the samples
        let train_dataset = WindowDataset::new(train_samples);
        let val_dataset   = WindowDataset::new(val_samples);

        // ── Step 8: Save config for inference ────────────────────────────────
        // The predictor needs to know the model architecture to rebuild it
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 9: Run training loop (Layer 5) ──────────────────────────────
        run_training(cfg, train_dataset, val_dataset, ckpt_manager)?;

        Ok(())
    }
}

// ─── Synthetic Stream Generation ─────────────────────────────────────────────
// In production you point data_dir at real per-ticker .jsonl streams.
// When the directory is empty or unlabelled, this fabricates a small
// demo stream (40 observed dates, a few posts each, random movements)
// so the pipeline can be exercised end to end without data.
fn build_synthetic_stream() -> PostStream {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    const PHRASES: &[&str] = &[
        "earnings beat expectations again",
        "guidance cut sends shares lower",
        "breakout above resistance on volume",
        "insider selling reported after close",
        "analyst upgrade with higher price target",
        "supply chain issues weigh on outlook",
        "short interest climbing fast",
        "dividend raised for the third year running",
        "new product launch well received",
        "regulatory probe announced today",
    ];

    let mut stream = PostStream::new("DEMO");

    for day in 0..40usize {
        // Dates stay within month lengths and sort chronologically
        let date = format!("2020-{:02}-{:02}", 1 + day / 28, 1 + day % 28);

        let posts_today = rng.gen_range(2..=5);
        for _ in 0..posts_today {
            let phrase = PHRASES[rng.gen_range(0..PHRASES.len())];
            stream.posts.push(Post::new(date.clone(), phrase));
        }

        stream.labels.push(MovementLabel {
            date:     date.clone(),
            movement: rng.gen_range(-0.05f32..0.05f32),
        });
    }

    stream
}

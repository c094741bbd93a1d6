// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// The two subcommands (`train` and `predict`) with every flag they
// accept. clap's derive macros turn the field layout into --help
// output, missing-argument errors and string→number parsing, so
// nothing here is hand-rolled.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

/// Everything the binary can be asked to do.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the movement model on .jsonl post streams
    Train(TrainArgs),

    /// Score a ticker's latest window using a trained checkpoint
    Predict(PredictArgs),
}

/// Flags accepted by `train`; each field surfaces as one --flag.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing per-ticker .jsonl post streams
    #[arg(long, default_value = "data/streams")]
    pub data_dir: String,

    /// Where checkpoints and the tokenizer file get written
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of consecutive observed dates per window
    #[arg(long, default_value_t = 5)]
    pub days: usize,

    /// Post slots per day — quiet days are padded with empty
    /// posts, busy days are clipped
    #[arg(long, default_value_t = 16)]
    pub posts_per_day: usize,

    /// Maximum tokens per post, [CLS] and [SEP] included
    #[arg(long, default_value_t = 32)]
    pub max_tokens: usize,

    /// Width of the post vectors the encoder produces
    /// Every post is represented as a vector of this size
    #[arg(long, default_value_t = 256)]
    pub embedding_dim: usize,

    /// Number of attention heads in the post encoder
    /// embedding_dim must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Number of stacked encoder blocks
    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    /// Inner dimension of the encoder feed-forward network
    /// Typically 4x embedding_dim
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Total number of unique tokens the encoder can recognise
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Trailing encoder blocks left trainable (0 = fully frozen)
    #[arg(long, default_value_t = 0)]
    pub trainable_encoder_layers: usize,

    /// Hidden size of each GRU direction over the day sequence
    /// (the bidirectional output is twice this wide)
    #[arg(long, default_value_t = 256)]
    pub gru_dim: usize,

    /// Width of the regression head's first layer — later layers
    /// narrow to a half and a quarter of this
    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    /// Probability of zeroing an activation during training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Number of windows processed together in one forward pass
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Full passes over the training windows
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam step size — 2e-4 trains stably at the default model size
    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    /// Fraction of windows used for training; the rest validate
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,
}

/// The one place CLI types become application types; past this
/// conversion no layer imports clap.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            checkpoint_dir: a.checkpoint_dir,
            days:           a.days,
            posts_per_day:  a.posts_per_day,
            max_tokens:     a.max_tokens,
            embedding_dim:  a.embedding_dim,
            num_heads:      a.num_heads,
            num_layers:     a.num_layers,
            d_ff:           a.d_ff,
            vocab_size:     a.vocab_size,
            trainable_encoder_layers: a.trainable_encoder_layers,
            gru_dim:        a.gru_dim,
            hidden_size:    a.hidden_size,
            dropout:        a.dropout,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            train_fraction: a.train_fraction,
        }
    }
}

/// Flags accepted by `predict`.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Ticker symbol whose stream should be scored
    #[arg(long)]
    pub ticker: String,

    /// Directory with .jsonl post streams (same as used during training)
    #[arg(long, default_value = "data/streams")]
    pub data_dir: String,

    /// Checkpoint directory a `train` run wrote to
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

// ============================================================
// Layer 4 — Window Encoding
// ============================================================
// Turns a LabeledWindow of raw post text into the fixed-size
// integer grids the batcher stacks into tensors:
//
//   window ──▶ [days][posts_per_day][max_tokens] × 3 grids
//              (token ids, segment ids, attention mask)
//
// Every post is framed as [CLS] tokens... [SEP] and padded to
// max_tokens; the clip keeps both markers when a post is long.
// Days with fewer posts than posts_per_day are filled with
// empty posts, which still carry [CLS] [SEP] — the attention
// mask of a slot is never all zero, so downstream softmax over
// token positions always has something to attend to.
//
// Special token IDs follow the BERT convention used by the
// tokenizer store: [PAD]=0, [CLS]=101, [SEP]=102.
//
// Reference: Devlin et al. (2019) BERT input representation

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::dataset::WindowSample;
use crate::domain::window::LabeledWindow;

/// Padding token id — also fills unused day slots
pub const PAD_ID: u32 = 0;
/// Classification marker, always the first token of a post
pub const CLS_ID: u32 = 101;
/// Separator marker, always the last real token of a post
pub const SEP_ID: u32 = 102;

/// Encodes windows against a fixed tokenizer and geometry.
pub struct WindowTokenizer<'a> {
    tokenizer:     &'a Tokenizer,
    max_tokens:    usize,
    posts_per_day: usize,
}

impl<'a> WindowTokenizer<'a> {
    /// # Panics
    /// Panics when max_tokens < 2 ([CLS] and [SEP] need a slot each)
    /// or posts_per_day is zero.
    pub fn new(tokenizer: &'a Tokenizer, max_tokens: usize, posts_per_day: usize) -> Self {
        assert!(
            max_tokens >= 2,
            "max_tokens must be at least 2 to hold [CLS] and [SEP], got {max_tokens}"
        );
        assert!(posts_per_day >= 1, "posts_per_day must be at least 1");
        Self {
            tokenizer,
            max_tokens,
            posts_per_day,
        }
    }

    /// Encode one post into (token ids, segment ids, attention mask),
    /// each exactly max_tokens long.
    pub fn encode_post(&self, text: &str) -> Result<(Vec<u32>, Vec<u32>, Vec<u32>)> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        // [CLS] body... [SEP], clipping the body so both markers fit
        let body = encoding.get_ids();
        let keep = body.len().min(self.max_tokens - 2);

        let mut ids: Vec<u32> = Vec::with_capacity(self.max_tokens);
        ids.push(CLS_ID);
        ids.extend_from_slice(&body[..keep]);
        ids.push(SEP_ID);

        let real_len = ids.len();
        ids.resize(self.max_tokens, PAD_ID);

        // Mask is 1 over real tokens (markers included), 0 over padding
        let mut mask = vec![1u32; real_len];
        mask.resize(self.max_tokens, 0);

        // Posts are single sentences, so every position is segment 0
        let segments = vec![0u32; self.max_tokens];

        Ok((ids, segments, mask))
    }

    /// Encode a whole window into a WindowSample. Days with more
    /// than posts_per_day posts are clipped; days with fewer are
    /// padded with empty posts.
    pub fn encode_window(&self, window: &LabeledWindow) -> Result<WindowSample> {
        let mut token_ids      = Vec::with_capacity(window.num_days());
        let mut segment_ids    = Vec::with_capacity(window.num_days());
        let mut attention_mask = Vec::with_capacity(window.num_days());

        for day in &window.day_posts {
            let mut day_ids  = Vec::with_capacity(self.posts_per_day);
            let mut day_segs = Vec::with_capacity(self.posts_per_day);
            let mut day_mask = Vec::with_capacity(self.posts_per_day);

            for post in day.iter().take(self.posts_per_day) {
                let (ids, segs, mask) = self.encode_post(&post.text)?;
                day_ids.push(ids);
                day_segs.push(segs);
                day_mask.push(mask);
            }

            // Quiet day: fill the remaining slots with empty posts
            while day_ids.len() < self.posts_per_day {
                let (ids, segs, mask) = self.encode_post("")?;
                day_ids.push(ids);
                day_segs.push(segs);
                day_mask.push(mask);
            }

            token_ids.push(day_ids);
            segment_ids.push(day_segs);
            attention_mask.push(day_mask);
        }

        Ok(WindowSample {
            token_ids,
            segment_ids,
            attention_mask,
            movement: window.movement,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

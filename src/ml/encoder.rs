// ============================================================
// Layer 5 — Frozen Post Encoder
// ============================================================
// BERT-style encoder that turns a batch of tokenised posts into
// fixed-width vectors (the hidden state at the [CLS] position).
// It stands in for the pretrained checkpoint named in the
// config: weights are loaded through CheckpointManager and then
// frozen, so the hierarchical model trains on top of a constant
// embedding function.
//
// The hierarchical model only ever sees the PostEncoder trait;
// tests substitute a stub encoder through the same seam.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// BERT pair convention: segment ids are 0 or 1
const SEGMENT_VOCAB: usize = 2;

// ─── PostEncoder (the seam the hierarchical model consumes) ───────────────────

/// Anything that can embed a batch of tokenised posts.
pub trait PostEncoder<B: Backend> {
    /// Width of the vectors `encode` produces.
    fn embedding_dim(&self) -> usize;

    /// token_ids / segment_ids / attention_mask: [n, tokens] → [n, embedding_dim]
    ///
    /// The mask uses 1 for real tokens and 0 for padding. All three
    /// inputs must share one shape.
    fn encode(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        segment_ids:    Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2>;
}

// ─── Configuration ────────────────────────────────────────────────────────────

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct PostEncoderConfig {
    pub vocab_size:    usize,
    pub max_tokens:    usize,
    pub embedding_dim: usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    pub dropout:       f64,
}

impl PostEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerPostEncoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device);
        let segment_embedding  = EmbeddingConfig::new(SEGMENT_VOCAB, self.embedding_dim).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_tokens, self.embedding_dim).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.embedding_dim).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        TransformerPostEncoder {
            token_embedding, segment_embedding, position_embedding,
            layers, final_norm, dropout,
            embedding_dim: self.embedding_dim,
            max_tokens:    self.max_tokens,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.embedding_dim, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.embedding_dim, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.embedding_dim).init(device);
        let norm1   = LayerNormConfig::new(self.embedding_dim).init(device);
        let norm2   = LayerNormConfig::new(self.embedding_dim).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Encoder block ────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// pad_mask: true where the token is padding and must be ignored.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── The encoder itself ───────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TransformerPostEncoder<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub segment_embedding:  Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub dropout:            Dropout,
    pub embedding_dim:      usize,
    pub max_tokens:         usize,
}

impl<B: Backend> TransformerPostEncoder<B> {
    /// Freeze the encoder, keeping only the last `trainable_suffix`
    /// blocks (and the final norm) trainable. A suffix of 0 freezes
    /// every parameter, which is the default training setup.
    pub fn freeze(self, trainable_suffix: usize) -> Self {
        let split = self.layers.len().saturating_sub(trainable_suffix);
        let layers: Vec<EncoderBlock<B>> = self
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, block)| if i < split { block.no_grad() } else { block })
            .collect();
        let final_norm = if trainable_suffix == 0 {
            self.final_norm.no_grad()
        } else {
            self.final_norm
        };
        Self {
            token_embedding:    self.token_embedding.no_grad(),
            segment_embedding:  self.segment_embedding.no_grad(),
            position_embedding: self.position_embedding.no_grad(),
            layers,
            final_norm,
            dropout:       self.dropout,
            embedding_dim: self.embedding_dim,
            max_tokens:    self.max_tokens,
        }
    }
}

impl<B: Backend> PostEncoder<B> for TransformerPostEncoder<B> {
    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn encode(
        &self,
        token_ids:      Tensor<B, 2, Int>,
        segment_ids:    Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [n, seq_len] = token_ids.dims();
        assert_eq!(
            token_ids.dims(), segment_ids.dims(),
            "segment ids shape {:?} does not match token ids shape {:?}",
            segment_ids.dims(), token_ids.dims(),
        );
        assert_eq!(
            token_ids.dims(), attention_mask.dims(),
            "attention mask shape {:?} does not match token ids shape {:?}",
            attention_mask.dims(), token_ids.dims(),
        );
        assert!(
            seq_len <= self.max_tokens,
            "post length {} exceeds the encoder maximum of {} tokens",
            seq_len, self.max_tokens,
        );

        let tok_emb = self.token_embedding.forward(token_ids);
        let seg_emb = self.segment_embedding.forward(segment_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([n, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        // Padding positions carry no content; mask them out of attention.
        let pad_mask = attention_mask.equal_elem(0);

        let mut x = self.dropout.forward(tok_emb + seg_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x); // [n, seq_len, embedding_dim]

        // The [CLS] position summarises the post.
        x.slice([0..n, 0..1, 0..self.embedding_dim])
            .reshape([n, self.embedding_dim])
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    fn tiny_config() -> PostEncoderConfig {
        PostEncoderConfig::new(32, 8, 16, 2, 2, 32, 0.0)
    }

    #[test]
    fn encode_produces_one_vector_per_post() {
        type B = NdArray;
        let device = Default::default();
        let encoder = tiny_config().init::<B>(&device);

        let ids  = Tensor::<B, 2, Int>::from_ints([[2, 5, 7, 3, 0, 0], [2, 9, 3, 0, 0, 0]], &device);
        let segs = Tensor::<B, 2, Int>::zeros([2, 6], &device);
        let mask = Tensor::<B, 2, Int>::from_ints([[1, 1, 1, 1, 0, 0], [1, 1, 1, 0, 0, 0]], &device);

        let out = encoder.encode(ids, segs, mask);
        assert_eq!(out.dims(), [2, 16]);
    }

    #[test]
    fn freeze_zero_suffix_detaches_every_parameter() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let encoder = tiny_config().init::<B>(&device);
        assert!(encoder.layers[0].ffn_linear1.weight.val().is_require_grad());

        let frozen = encoder.freeze(0);
        assert!(!frozen.token_embedding.weight.val().is_require_grad());
        assert!(!frozen.layers[0].ffn_linear1.weight.val().is_require_grad());
        assert!(!frozen.layers[1].ffn_linear1.weight.val().is_require_grad());
        assert!(!frozen.final_norm.gamma.val().is_require_grad());
    }

    #[test]
    fn freeze_suffix_keeps_last_blocks_trainable() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let frozen = tiny_config().init::<B>(&device).freeze(1);

        assert!(!frozen.layers[0].ffn_linear1.weight.val().is_require_grad());
        assert!(frozen.layers[1].ffn_linear1.weight.val().is_require_grad());
        assert!(frozen.final_norm.gamma.val().is_require_grad());
    }

    #[test]
    #[should_panic(expected = "exceeds the encoder maximum")]
    fn encode_rejects_over_length_posts() {
        type B = NdArray;
        let device = Default::default();
        let encoder = tiny_config().init::<B>(&device);

        let ids  = Tensor::<B, 2, Int>::zeros([1, 9], &device);
        let segs = Tensor::<B, 2, Int>::zeros([1, 9], &device);
        let mask = Tensor::<B, 2, Int>::ones([1, 9], &device);
        encoder.encode(ids, segs, mask);
    }
}

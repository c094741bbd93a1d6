use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};

use crate::ml::encoder::PostEncoder;
use crate::ml::gru::{BiGru, BiGruConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct HanConfig {
    pub embedding_dim: usize,
    pub gru_dim:       usize,
    pub hidden_size:   usize,
    pub days:          usize,
    pub posts_per_day: usize,
    pub dropout:       f64,
}

impl HanConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> HanModel<B> {
        assert!(
            self.hidden_size >= 4,
            "hidden_size must be at least 4 so every head layer keeps a positive width, got {}",
            self.hidden_size,
        );
        assert!(
            self.days >= 1 && self.posts_per_day >= 1,
            "window geometry must be at least 1 day × 1 post, got {} × {}",
            self.days, self.posts_per_day,
        );

        // Head widths shrink by floor division, so hidden_size need not
        // be a multiple of 4.
        let mid    = self.hidden_size / 2;
        let narrow = self.hidden_size / 4;

        HanModel {
            post_attention: AttentionPool {
                proj: LinearConfig::new(self.embedding_dim, 1).init(device),
            },
            temporal: BiGruConfig::new(self.embedding_dim, self.gru_dim).init(device),
            day_attention: AttentionPool {
                proj: LinearConfig::new(2 * self.gru_dim, 1).init(device),
            },
            fc1: LinearConfig::new(2 * self.gru_dim, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, mid).init(device),
            fc3: LinearConfig::new(mid, narrow).init(device),
            fc4: LinearConfig::new(narrow, 1).init(device),
            dropout:       DropoutConfig::new(self.dropout).init(),
            days:          self.days,
            posts_per_day: self.posts_per_day,
            embedding_dim: self.embedding_dim,
        }
    }
}

// ─── Attention pooling ────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct AttentionPool<B: Backend> {
    pub proj: Linear<B>,
}

impl<B: Backend> AttentionPool<B> {
    /// Normalised attention weights along `dim`: one logit per feature
    /// vector, squashed to (0, 1) by a sigmoid, then softmax-normalised.
    /// The sigmoid stage is part of the model definition, not a leftover.
    /// Output has the same rank as `x` with the last axis collapsed to 1.
    pub fn weights<const D: usize>(&self, x: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
        activation::softmax(activation::sigmoid(self.proj.forward(x)), dim)
    }
}

/// ELU with α = 1: identity for positives, exp(x) − 1 for negatives.
fn elu<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.clone().clamp_min(0.0) + (x.clamp_max(0.0).exp() - 1.0)
}

// ─── Hierarchical attention model ─────────────────────────────────────────────

/// Post-level attention → bidirectional GRU over days → day-level
/// attention → regression head. The post encoder sits outside this
/// module so its parameters stay frozen while this one trains.
#[derive(Module, Debug)]
pub struct HanModel<B: Backend> {
    pub post_attention: AttentionPool<B>,
    pub temporal:       BiGru<B>,
    pub day_attention:  AttentionPool<B>,
    pub fc1:            Linear<B>,
    pub fc2:            Linear<B>,
    pub fc3:            Linear<B>,
    pub fc4:            Linear<B>,
    pub dropout:        Dropout,
    pub days:           usize,
    pub posts_per_day:  usize,
    pub embedding_dim:  usize,
}

impl<B: Backend> HanModel<B> {
    /// embeddings: [batch, days, posts_per_day, embedding_dim] → scores [batch, 1]
    pub fn forward(&self, embeddings: Tensor<B, 4>) -> Tensor<B, 2> {
        let [_, days, posts, dim] = embeddings.dims();
        assert_eq!(
            days, self.days,
            "embedding tensor has {} days but the model was built for {}",
            days, self.days,
        );
        assert_eq!(
            posts, self.posts_per_day,
            "embedding tensor has {} post slots per day but the model was built for {}",
            posts, self.posts_per_day,
        );
        assert_eq!(
            dim, self.embedding_dim,
            "embedding width {} does not match the configured {}",
            dim, self.embedding_dim,
        );

        // Collapse each day's posts into one day vector. The projection is
        // shared across days; the softmax runs per (batch, day) pair.
        let post_weights = self.post_attention.weights(embeddings.clone(), 2); // [b, days, posts, 1]
        let day_repr = (embeddings * post_weights)
            .sum_dim(2)
            .squeeze::<3>(2); // [b, days, dim]

        // Read the day sequence in both directions.
        let temporal = self.temporal.forward(day_repr); // [b, days, 2 × gru_dim]

        // Collapse the days into one window vector.
        let day_weights = self.day_attention.weights(temporal.clone(), 1); // [b, days, 1]
        let window = (temporal * day_weights)
            .sum_dim(1)
            .squeeze::<2>(1); // [b, 2 × gru_dim]

        self.head(window) // [b, 1]
    }

    /// Regression head: widths fall hidden → hidden/2 → hidden/4 → 1,
    /// ELU after every layer except the last, dropout after the first
    /// two linear transforms. Dropout is live only on autodiff backends.
    fn head(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = elu(self.dropout.forward(self.fc1.forward(x)));
        let x = self.dropout.forward(elu(self.fc2.forward(x)));
        let x = elu(self.fc3.forward(x));
        self.fc4.forward(x)
    }
}

// ─── Window orchestration ─────────────────────────────────────────────────────

/// Full window pass: (batch, days, posts_per_day, 3, tokens) int tensor
/// → (batch, 1) movement scores.
///
/// Axis 3 stacks token ids (field 0), segment ids (field 1), and the
/// attention mask (field 2). Every post slot is flattened into one
/// leading axis so the encoder runs exactly once per call instead of
/// once per slot.
pub fn forward_window<B: Backend, E: PostEncoder<B>>(
    encoder: &E,
    model:   &HanModel<B>,
    windows: Tensor<B, 5, Int>,
) -> Tensor<B, 2> {
    let [batch_size, days, posts, fields, tokens] = windows.dims();
    assert_eq!(
        days, model.days,
        "window tensor has {} days but the model was built for {}",
        days, model.days,
    );
    assert_eq!(
        posts, model.posts_per_day,
        "window tensor has {} post slots per day but the model was built for {}",
        posts, model.posts_per_day,
    );
    assert_eq!(
        fields, 3,
        "axis 3 must stack exactly [token ids, segment ids, attention mask], got {} fields",
        fields,
    );

    let flat = batch_size * days * posts;
    let token_ids = windows.clone()
        .slice([0..batch_size, 0..days, 0..posts, 0..1, 0..tokens])
        .reshape([flat, tokens]);
    let segment_ids = windows.clone()
        .slice([0..batch_size, 0..days, 0..posts, 1..2, 0..tokens])
        .reshape([flat, tokens]);
    let attention_mask = windows
        .slice([0..batch_size, 0..days, 0..posts, 2..3, 0..tokens])
        .reshape([flat, tokens]);

    let embedded = encoder.encode(token_ids, segment_ids, attention_mask);
    assert_eq!(
        embedded.dims(), [flat, model.embedding_dim],
        "encoder returned {:?} for {} posts of width {}",
        embedded.dims(), flat, model.embedding_dim,
    );

    let embeddings = embedded.reshape([batch_size, days, posts, model.embedding_dim]);
    model.forward(embeddings)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;
    type Device = <B as Backend>::Device;

    /// Encoder stub: every post embeds to a vector whose entries all equal
    /// the sum of its token ids, so distinct posts get distinct embeddings
    /// without any weights involved.
    struct TokenSumEncoder {
        dim: usize,
    }

    impl PostEncoder<B> for TokenSumEncoder {
        fn embedding_dim(&self) -> usize {
            self.dim
        }

        fn encode(
            &self,
            token_ids:       Tensor<B, 2, Int>,
            _segment_ids:    Tensor<B, 2, Int>,
            _attention_mask: Tensor<B, 2, Int>,
        ) -> Tensor<B, 2> {
            let [n, _] = token_ids.dims();
            let sums = token_ids.float().sum_dim(1); // [n, 1]
            Tensor::ones([n, self.dim], &sums.device()) * sums
        }
    }

    fn window(device: &Device, flat: Vec<i32>, dims: [usize; 5]) -> Tensor<B, 5, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape(dims)
    }

    /// Smallest end-to-end geometry: 2 days × 1 post × 3 tokens,
    /// 4-wide embeddings, 4-wide GRU, 8-wide head.
    fn demo_config() -> HanConfig {
        HanConfig::new(4, 4, 8, 2, 1, 0.0)
    }

    fn demo_flat() -> Vec<i32> {
        vec![
            5, 6, 7, /* segs */ 0, 0, 0, /* mask */ 1, 1, 1, // day 1
            9, 2, 1, /* segs */ 0, 0, 0, /* mask */ 1, 1, 1, // day 2
        ]
    }

    #[test]
    fn scores_are_one_per_window_and_finite() {
        let device = Default::default();
        let model = demo_config().init::<B>(&device);
        let encoder = TokenSumEncoder { dim: 4 };

        // Batch of two identical windows.
        let mut flat = demo_flat();
        flat.extend(demo_flat());
        let out = forward_window(&encoder, &model, window(&device, flat, [2, 2, 1, 3, 3]));

        assert_eq!(out.dims(), [2, 1]);
        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| v.is_finite()), "scores must be finite: {values:?}");
    }

    #[test]
    fn post_weights_are_a_distribution_per_day() {
        let device = Default::default();
        let model = demo_config().init::<B>(&device);

        let x = Tensor::<B, 4>::from_floats(
            [
                [
                    [[0.5, -1.0, 2.0, 0.0], [1.5, 0.5, -0.5, 1.0], [0.0, 0.0, 3.0, -2.0]],
                    [[-0.5, 1.0, 1.0, 1.0], [2.0, -2.0, 0.5, 0.5], [1.0, 1.0, 1.0, 1.0]],
                ],
            ],
            &device,
        ); // [1, 2, 3, 4]
        let weights = model.post_attention.weights(x, 2); // [1, 2, 3, 1]

        let all: Vec<f32> = weights.clone().into_data().to_vec().unwrap();
        assert!(all.iter().all(|w| *w >= 0.0), "weights must be non-negative: {all:?}");

        let sums: Vec<f32> = weights.sum_dim(2).into_data().to_vec().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "per-day weights must sum to 1, got {s}");
        }
    }

    #[test]
    fn day_weights_are_a_distribution_per_window() {
        let device = Default::default();
        let model = demo_config().init::<B>(&device);

        let x = Tensor::<B, 3>::from_floats(
            [
                [[0.5, -1.0, 2.0, 0.0, 1.0, -1.0, 0.25, 0.75], [1.0; 8], [0.0; 8]],
                [[-2.0, 2.0, -2.0, 2.0, 0.0, 0.0, 1.0, 1.0], [0.5; 8], [0.25; 8]],
            ],
            &device,
        ); // [2, 3, 8]
        let weights = model.day_attention.weights(x, 1); // [2, 3, 1]

        let all: Vec<f32> = weights.clone().into_data().to_vec().unwrap();
        assert!(all.iter().all(|w| *w >= 0.0));

        let sums: Vec<f32> = weights.sum_dim(1).into_data().to_vec().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "per-window weights must sum to 1, got {s}");
        }
    }

    #[test]
    fn a_single_post_day_pools_to_its_own_embedding() {
        let device = Default::default();
        let model = demo_config().init::<B>(&device);

        let x = Tensor::<B, 4>::from_floats(
            [[[[0.5, -1.5, 2.0, 0.25]], [[1.0, 1.0, -1.0, 0.0]]]],
            &device,
        ); // [1, 2, 1, 4]

        // Softmax over a single slot is exactly 1, so pooling is identity.
        let weights = model.post_attention.weights(x.clone(), 2);
        let pooled = (x.clone() * weights).sum_dim(2).squeeze::<3>(2);

        let expected: Vec<f32> = x.squeeze::<3>(2).into_data().to_vec().unwrap();
        let got: Vec<f32> = pooled.into_data().to_vec().unwrap();
        for (e, g) in expected.iter().zip(got.iter()) {
            assert!((e - g).abs() < 1e-6, "expected {e}, got {g}");
        }
    }

    #[test]
    fn forward_is_deterministic_outside_training() {
        let device = Default::default();
        // Non-zero dropout probability; inert on a non-autodiff backend.
        let model = HanConfig::new(4, 4, 8, 2, 1, 0.3).init::<B>(&device);
        let encoder = TokenSumEncoder { dim: 4 };

        let a = forward_window(&encoder, &model, window(&device, demo_flat(), [1, 2, 1, 3, 3]));
        let b = forward_window(&encoder, &model, window(&device, demo_flat(), [1, 2, 1, 3, 3]));

        let a: Vec<f32> = a.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn posts_within_a_day_commute() {
        let device = Default::default();
        let model = HanConfig::new(4, 4, 8, 2, 2, 0.0).init::<B>(&device);
        let encoder = TokenSumEncoder { dim: 4 };

        let original = vec![
            1, 2, 0, 0, 1, 1, /* day 1 post 2 */ 3, 4, 0, 0, 1, 1,
            5, 6, 0, 0, 1, 1, /* day 2 post 2 */ 7, 8, 0, 0, 1, 1,
        ];
        let swapped_posts = vec![
            3, 4, 0, 0, 1, 1, /* day 1 post 2 */ 1, 2, 0, 0, 1, 1,
            7, 8, 0, 0, 1, 1, /* day 2 post 2 */ 5, 6, 0, 0, 1, 1,
        ];

        let a = forward_window(&encoder, &model, window(&device, original, [1, 2, 2, 3, 2]));
        let b = forward_window(&encoder, &model, window(&device, swapped_posts, [1, 2, 2, 3, 2]));

        let a: Vec<f32> = a.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5, "post order within a day must not matter: {x} vs {y}");
        }
    }

    #[test]
    fn day_order_changes_the_score() {
        let device = Default::default();
        let model = HanConfig::new(4, 4, 8, 2, 2, 0.0).init::<B>(&device);
        let encoder = TokenSumEncoder { dim: 4 };

        let original = vec![
            1, 2, 0, 0, 1, 1, 3, 4, 0, 0, 1, 1, // day 1
            5, 6, 0, 0, 1, 1, 7, 8, 0, 0, 1, 1, // day 2
        ];
        let swapped_days = vec![
            5, 6, 0, 0, 1, 1, 7, 8, 0, 0, 1, 1, // day 2 first
            1, 2, 0, 0, 1, 1, 3, 4, 0, 0, 1, 1,
        ];

        let a = forward_window(&encoder, &model, window(&device, original, [1, 2, 2, 3, 2]));
        let b = forward_window(&encoder, &model, window(&device, swapped_days, [1, 2, 2, 3, 2]));

        let a: Vec<f32> = a.into_data().to_vec().unwrap();
        let b: Vec<f32> = b.into_data().to_vec().unwrap();
        let diff = (a[0] - b[0]).abs();
        assert!(diff > 1e-7, "day order must matter, diff = {diff}");
    }

    #[test]
    fn head_widths_floor_divide() {
        let device = Default::default();
        // 10 → 5 → 2 → 1
        let model = HanConfig::new(4, 4, 10, 2, 1, 0.0).init::<B>(&device);
        assert_eq!(model.fc2.weight.val().dims(), [10, 5]);
        assert_eq!(model.fc3.weight.val().dims(), [5, 2]);
        assert_eq!(model.fc4.weight.val().dims(), [2, 1]);
    }

    #[test]
    fn elu_matches_its_definition() {
        let device = Default::default();
        let x = Tensor::<B, 1>::from_floats([-1.0, 0.0, 2.0], &device);
        let y: Vec<f32> = elu(x).into_data().to_vec().unwrap();
        assert!((y[0] - ((-1.0f32).exp() - 1.0)).abs() < 1e-6);
        assert!(y[1].abs() < 1e-6);
        assert!((y[2] - 2.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "days but the model was built for")]
    fn wrong_day_count_fails_fast() {
        let device = Default::default();
        let model = demo_config().init::<B>(&device);
        let encoder = TokenSumEncoder { dim: 4 };

        let mut flat = demo_flat();
        flat.extend([4, 4, 4, 0, 0, 0, 1, 1, 1]); // a third day
        forward_window(&encoder, &model, window(&device, flat, [1, 3, 1, 3, 3]));
    }

    #[test]
    #[should_panic(expected = "axis 3 must stack exactly")]
    fn wrong_field_count_fails_fast() {
        let device = Default::default();
        let model = demo_config().init::<B>(&device);
        let encoder = TokenSumEncoder { dim: 4 };

        // Only ids + mask, no segment field.
        let flat = vec![5, 6, 7, 1, 1, 1, 9, 2, 1, 1, 1, 1];
        forward_window(&encoder, &model, window(&device, flat, [1, 2, 1, 2, 3]));
    }
}

// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<WindowSample>
// into GPU-ready tensors.
//
// How batching works here:
//   Input:  Vec of N WindowSamples, each a [days][posts][tokens]
//           grid per field (ids / segments / mask)
//   Output: WindowBatch with one [N, days, posts, 3, tokens] tensor
//
//   Each field grid is flattened into one long Vec, reshaped to
//   [N, days, posts, tokens], and the three fields are stacked on
//   a new axis 3 in the order ids, segments, mask.
//
// All post rows are already padded to the same token length by the
// window tokenizer, so no dynamic padding happens here.
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::WindowSample;

// ─── WindowBatch ──────────────────────────────────────────────────────────────
/// A batch of trading windows ready for the model forward pass.
///
/// B is the Burn Backend (e.g. Wgpu, NdArray) —
/// generic so the same batcher works on any device.
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Stacked window tensor — shape: [batch, days, posts_per_day, 3, tokens]
    /// Axis 3 holds token ids (0), segment ids (1), attention mask (2)
    pub windows: Tensor<B, 5, Int>,

    /// Movement targets — shape: [batch, 1]
    pub targets: Tensor<B, 2>,
}

// ─── WindowBatcher ────────────────────────────────────────────────────────────
/// The batcher struct — holds the target device so tensors
/// are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    /// The device to create tensors on (e.g. GPU index 0)
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    /// Create a new batcher for the given device
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader calls .batch(items) with each mini-batch of samples.
impl<B: Backend> Batcher<WindowSample, WindowBatch<B>> for WindowBatcher<B> {
    /// Convert a Vec of WindowSamples into a single WindowBatch.
    ///
    /// Steps:
    ///   1. Flatten each field grid into one Vec<i32>
    ///   2. Create a 1D tensor and reshape to [batch, days, posts, tokens]
    ///   3. Stack the three field tensors on a new axis 3
    ///   4. Collect movement targets into a [batch, 1] float tensor
    fn batch(&self, items: Vec<WindowSample>) -> WindowBatch<B> {
        let batch_size = items.len();
        // All windows share one geometry (pre-padded by the tokenizer)
        let days   = items[0].days();
        let posts  = items[0].posts_per_day();
        let tokens = items[0].tokens();

        let flatten = |field: fn(&WindowSample) -> &Vec<Vec<Vec<u32>>>| -> Vec<i32> {
            items
                .iter()
                .flat_map(|s| field(s).iter())
                .flat_map(|day| day.iter())
                .flat_map(|post| post.iter().map(|&x| x as i32))
                .collect()
        };

        let ids_flat  = flatten(|s| &s.token_ids);
        let segs_flat = flatten(|s| &s.segment_ids);
        let mask_flat = flatten(|s| &s.attention_mask);

        let shape = [batch_size, days, posts, tokens];
        let token_ids = Tensor::<B, 1, Int>::from_ints(
            ids_flat.as_slice(), &self.device
        ).reshape(shape);

        let segment_ids = Tensor::<B, 1, Int>::from_ints(
            segs_flat.as_slice(), &self.device
        ).reshape(shape);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape(shape);

        // [batch, days, posts, tokens] × 3 → [batch, days, posts, 3, tokens]
        let windows = Tensor::stack::<5>(vec![token_ids, segment_ids, attention_mask], 3);

        let targets_flat: Vec<f32> = items.iter().map(|s| s.movement).collect();
        let targets = Tensor::<B, 1>::from_floats(
            targets_flat.as_slice(), &self.device
        ).reshape([batch_size, 1]);

        WindowBatch { windows, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn sample(ids: [[u32; 3]; 2], movement: f32) -> WindowSample {
        // 2 days × 1 post × 3 tokens, single-segment posts
        WindowSample {
            token_ids:      ids.iter().map(|post| vec![post.to_vec()]).collect(),
            segment_ids:    vec![vec![vec![0, 0, 0]]; 2],
            attention_mask: vec![vec![vec![1, 1, 0]]; 2],
            movement,
        }
    }

    #[test]
    fn batch_has_the_five_axis_layout() {
        let batcher = WindowBatcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![
            sample([[5, 6, 0], [7, 8, 0]], 0.5),
            sample([[9, 1, 0], [2, 3, 0]], -0.25),
        ]);

        assert_eq!(batch.windows.dims(), [2, 2, 1, 3, 3]);
        assert_eq!(batch.targets.dims(), [2, 1]);
    }

    #[test]
    fn fields_are_stacked_in_id_segment_mask_order() {
        let batcher = WindowBatcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![sample([[5, 6, 0], [7, 8, 0]], 0.5)]);

        let ids: Vec<i32> = batch.windows.clone()
            .slice([0..1, 0..1, 0..1, 0..1, 0..3])
            .into_data()
            .convert::<i32>()
            .to_vec()
            .unwrap();
        assert_eq!(ids, vec![5, 6, 0]);

        let mask: Vec<i32> = batch.windows
            .slice([0..1, 0..1, 0..1, 2..3, 0..3])
            .into_data()
            .convert::<i32>()
            .to_vec()
            .unwrap();
        assert_eq!(mask, vec![1, 1, 0]);
    }

    #[test]
    fn targets_keep_sample_order() {
        let batcher = WindowBatcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![
            sample([[1, 2, 3], [4, 5, 6]], 0.75),
            sample([[1, 2, 3], [4, 5, 6]], -0.5),
        ]);

        let targets: Vec<f32> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0.75, -0.5]);
    }
}

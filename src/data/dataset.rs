use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One fully tokenised trading window: a [days][posts_per_day][tokens]
/// grid per field plus the movement target. Every post row is already
/// truncated and padded, so the batcher can flatten without inspecting
/// lengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSample {
    pub token_ids:      Vec<Vec<Vec<u32>>>,
    pub segment_ids:    Vec<Vec<Vec<u32>>>,
    pub attention_mask: Vec<Vec<Vec<u32>>>,
    pub movement:       f32,
}

impl WindowSample {
    pub fn days(&self) -> usize {
        self.token_ids.len()
    }

    pub fn posts_per_day(&self) -> usize {
        self.token_ids.first().map_or(0, |day| day.len())
    }

    pub fn tokens(&self) -> usize {
        self.token_ids
            .first()
            .and_then(|day| day.first())
            .map_or(0, |post| post.len())
    }
}

pub struct WindowDataset {
    samples: Vec<WindowSample>,
}

impl WindowDataset {
    pub fn new(samples: Vec<WindowSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<WindowSample> for WindowDataset {
    fn get(&self, index: usize) -> Option<WindowSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

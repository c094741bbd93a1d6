// ============================================================
// Layer 4 — Trading Window Builder
// ============================================================
// Turns one ticker's flat post stream into labelled windows:
//
//   posts ──group by date──▶ day buckets ──slide──▶ windows
//
//   dates:   d0   d1   d2   d3   d4        (observed post dates)
//   window:  [d0  d1  d2]  ↑
//   label:   movement recorded for d3
//
// "Consecutive" means consecutive in the stream: only dates that
// actually carry posts count, so weekends and silent days never
// produce empty windows. A window is kept only when the date
// right after it has a recorded movement; the follow-up date
// itself is never part of the window.
//
// Reference: Xu & Cohen (2018) - stock movement from tweets
//            Rust Book §8 (Collections)

use std::collections::{BTreeMap, HashMap};

use crate::domain::post::{Post, PostStream};
use crate::domain::window::LabeledWindow;

/// Slides a fixed-length day window over a post stream.
pub struct WindowBuilder {
    /// Number of consecutive observed dates per window
    days: usize,
}

impl WindowBuilder {
    /// Create a builder for windows of `days` observed dates.
    ///
    /// # Panics
    /// Panics if days is zero — a window must cover at least one day.
    pub fn new(days: usize) -> Self {
        assert!(days >= 1, "a window must cover at least one day, got {days}");
        Self { days }
    }

    /// Group posts by their date. BTreeMap keys iterate in sorted
    /// order and ISO dates sort chronologically as text, so the
    /// grouping doubles as the sort.
    fn group_by_day(posts: &[Post]) -> BTreeMap<String, Vec<Post>> {
        let mut by_day: BTreeMap<String, Vec<Post>> = BTreeMap::new();
        for post in posts {
            by_day
                .entry(post.date.clone())
                .or_default()
                .push(post.clone());
        }
        by_day
    }

    /// Build every labelled window the stream supports.
    pub fn build(&self, stream: &PostStream) -> Vec<LabeledWindow> {
        let by_day = Self::group_by_day(&stream.posts);

        // Need the window itself plus one follow-up date for the label
        if by_day.len() <= self.days {
            return Vec::new();
        }

        let dates: Vec<String> = by_day.keys().cloned().collect();
        let labels: HashMap<&str, f32> = stream
            .labels
            .iter()
            .map(|l| (l.date.as_str(), l.movement))
            .collect();

        let mut windows = Vec::new();

        for start in 0..(dates.len() - self.days) {
            let target = &dates[start + self.days];

            let movement = match labels.get(target.as_str()) {
                Some(&m) => m,
                // No recorded movement for the follow-up date
                None => continue,
            };

            let window_dates: Vec<String> = dates[start..start + self.days].to_vec();
            let day_posts: Vec<Vec<Post>> = window_dates
                .iter()
                .map(|d| by_day[d].clone())
                .collect();

            windows.push(LabeledWindow::new(window_dates, day_posts, movement));
        }

        tracing::debug!(
            "{}: {} observed dates → {} labelled windows",
            stream.ticker,
            dates.len(),
            windows.len()
        );

        windows
    }

    /// The most recent window of the stream, for scoring. No
    /// follow-up movement exists yet, so the label is a 0.0
    /// placeholder the caller must ignore.
    pub fn latest(&self, stream: &PostStream) -> Option<LabeledWindow> {
        let by_day = Self::group_by_day(&stream.posts);
        if by_day.len() < self.days {
            return None;
        }

        let dates: Vec<String> = by_day.keys().cloned().collect();
        let start = dates.len() - self.days;

        let window_dates: Vec<String> = dates[start..].to_vec();
        let day_posts: Vec<Vec<Post>> = window_dates
            .iter()
            .map(|d| by_day[d].clone())
            .collect();

        Some(LabeledWindow::new(window_dates, day_posts, 0.0))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

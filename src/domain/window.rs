// ============================================================
// Layer 3 — Trading Window Domain Types
// ============================================================
// Represents one training example in domain terms:
//   - `days` consecutive observed trading dates
//   - the posts published on each of those dates
//   - the movement value of the date that FOLLOWS the window
//
// The model reads the window and predicts the following
// day's movement, so the label always comes from one date
// past the window's last day.
//
// Reference: Xu & Cohen (2018) - stock movement from tweets
//            Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};

use crate::domain::post::Post;

/// Next-day movement value for one trading date.
/// Positive means the price moved up on that date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementLabel {
    /// Trading date, ISO "YYYY-MM-DD"
    pub date: String,

    /// Signed movement (e.g. daily return); the regression target
    pub movement: f32,
}

/// A labelled window of consecutive observed trading dates.
///
/// `day_posts[i]` holds the posts of `dates[i]`; both vectors
/// always have the same length (the configured window length).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledWindow {
    /// The window's dates, oldest first
    pub dates: Vec<String>,

    /// Posts grouped per date, parallel to `dates`
    pub day_posts: Vec<Vec<Post>>,

    /// Movement of the first observed date AFTER the window
    pub movement: f32,
}

impl LabeledWindow {
    pub fn new(dates: Vec<String>, day_posts: Vec<Vec<Post>>, movement: f32) -> Self {
        Self {
            dates,
            day_posts,
            movement,
        }
    }

    /// Number of days covered by this window
    pub fn num_days(&self) -> usize {
        self.dates.len()
    }

    /// Total number of posts across all days of the window
    pub fn num_posts(&self) -> usize {
        self.day_posts.iter().map(|day| day.len()).sum()
    }
}

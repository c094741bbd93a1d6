// ============================================================
// Layer 3 — Post Domain Types
// ============================================================
// Represents a single social-media post and the per-ticker
// stream it belongs to. Plain data structs with no behaviour —
// a date, a text, and (for the stream) the movement labels
// that training windows are aligned against.
//
// Reference: Xu & Cohen (2018) - stock movement from tweets
//            Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// One raw post from a daily stream.
/// Format-agnostic — by the time a Post is created, the text
/// has already been pulled out of whatever feed it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Trading date the post belongs to, ISO "YYYY-MM-DD".
    /// Kept as a string: ISO dates order correctly as text.
    pub date: String,

    /// The post text before any cleaning or tokenisation
    pub text: String,
}

impl Post {
    /// Create a new Post with a date and text content.
    /// Uses impl Into<String> so callers can pass &str or String.
    pub fn new(date: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            text: text.into(),
        }
    }
}

/// Everything loaded for one ticker: its posts plus the
/// movement labels the windows will be aligned against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostStream {
    /// Ticker symbol, taken from the source file stem
    pub ticker: String,

    /// All posts for this ticker, in file order (not yet grouped by day)
    pub posts: Vec<Post>,

    /// Movement labels keyed by date (may be empty for inference streams)
    pub labels: Vec<crate::domain::window::MovementLabel>,
}

impl PostStream {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            posts:  Vec::new(),
            labels: Vec::new(),
        }
    }
}

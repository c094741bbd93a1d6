// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans raw post text before tokenisation.
//
// Scraped posts tend to contain:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Stray \r\n pairs even though a post is logically one line
//   - URLs (mostly shorteners) that are unique per post
//   - @mentions that explode the vocabulary with usernames
//   - Cashtags ($AAPL) that carry real signal and must survive
//
// URLs and mentions are rewritten to the [URL] and [USER]
// placeholder tokens; the tokenizer registers both as special
// tokens so they stay atomic. Cashtags pass through unchanged.
//
// Cleaning happens in two passes:
//   1. Character pass: whitespace variants, line breaks, and
//      control characters become plain spaces
//   2. Token pass: URLs and @mentions become placeholders, then
//      whitespace runs collapse and the edges are trimmed
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one raw post for downstream tokenisation.
    pub fn clean(&self, text: &str) -> String {

        // ── Step 1: Normalise individual characters ───────────────────────────
        // Whitespace variants (tab, non-breaking, zero-width, BOM),
        // line breaks, and control characters all become plain
        // spaces; Step 2 collapses the runs.
        let step1: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                '\r' | '\n' => ' ',
                c if c.is_control() => ' ',
                c => c,
            })
            .collect();

        // ── Step 2: Rewrite noisy token classes ───────────────────────────────
        // split_whitespace also collapses runs of spaces and trims
        // the edges, so no separate collapse pass is needed.
        let tokens: Vec<&str> = step1
            .split_whitespace()
            .map(|word| {
                let lower = word.to_lowercase();
                if lower.starts_with("http://")
                    || lower.starts_with("https://")
                    || lower.starts_with("www.")
                {
                    "[URL]"
                } else if word.len() > 1 && word.starts_with('@') {
                    // A lone '@' is just the word "at", not a mention
                    "[USER]"
                } else {
                    word
                }
            })
            .collect();

        tokens.join(" ")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_become_placeholder() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("breakout chart https://t.co/xYz123"), "breakout chart [URL]");
        assert_eq!(p.clean("see www.example.com for more"), "see [URL] for more");
    }

    #[test]
    fn test_mentions_become_placeholder() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("@trader_jane called the top"), "[USER] called the top");
    }

    #[test]
    fn test_lone_at_sign_is_kept() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("earnings call @ noon"), "earnings call @ noon");
    }

    #[test]
    fn test_cashtags_survive() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("$AAPL gapping up premarket"), "$AAPL gapping up premarket");
    }

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello   world"), "hello world");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_flattens_line_breaks() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("two\r\nlines"), "two lines");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        // \x01 is a control character that should become a space
        assert_eq!(p.clean("hello\x01world"), "hello world");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }
}

// ============================================================
// Layer 4 — Post Stream Loader
// ============================================================
// Loads per-ticker post streams from a directory of JSONL files.
//
// Expected directory layout:
//   data/streams/
//     AAPL.jsonl           ← one post per line: {"date": "...", "text": "..."}
//     AAPL.returns.jsonl   ← one label per line: {"date": "...", "movement": 0.012}
//     TSLA.jsonl
//     TSLA.returns.jsonl
//
// The file stem names the ticker. A stream without a returns file
// still loads (it can be scored, just not trained on). Malformed
// files are skipped with a warning; malformed lines are skipped
// with a debug log, so one bad row never sinks the corpus.
//
// Reference: Rust Book §8 (Collections)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::post::{Post, PostStream};
use crate::domain::traits::PostSource;
use crate::domain::window::MovementLabel;

/// Loads all .jsonl post streams from a given directory.
/// Implements the PostSource trait from Layer 3.
pub struct JsonlPostLoader {
    /// Path to the directory containing .jsonl files
    dir: String,
}

impl JsonlPostLoader {
    /// Create a new JsonlPostLoader pointed at a directory
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Implement the PostSource trait so the application layer
/// can call load_all() without knowing about the file layout
impl PostSource for JsonlPostLoader {
    fn load_all(&self) -> Result<Vec<PostStream>> {
        let dir = Path::new(&self.dir);

        // If the directory doesn't exist, return empty rather than crashing.
        // This allows the system to run even without data (demo mode).
        if !dir.exists() {
            tracing::warn!(
                "Data directory '{}' does not exist — returning empty corpus",
                self.dir
            );
            return Ok(Vec::new());
        }

        let mut streams = Vec::new();

        // Walk every entry in the directory
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir))?
        {
            let entry = entry?;
            let path  = entry.path();

            // Label files are picked up alongside their stream, not on their own
            let is_labels = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(".returns.jsonl"));

            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") && !is_labels {
                match load_single_stream(&path) {
                    Ok(stream) => {
                        tracing::debug!(
                            "Loaded: {} ({} posts, {} labels)",
                            stream.ticker,
                            stream.posts.len(),
                            stream.labels.len()
                        );
                        streams.push(stream);
                    }
                    // Log a warning but continue — don't fail on one bad file
                    Err(e) => {
                        tracing::warn!(
                            "Skipping '{}': {}",
                            path.display(),
                            e
                        );
                    }
                }
            }
        }

        tracing::info!("Successfully loaded {} post streams", streams.len());
        Ok(streams)
    }
}

/// Parse one ticker's stream: the posts file and, when present,
/// the sibling `<ticker>.returns.jsonl` labels file.
fn load_single_stream(path: &Path) -> Result<PostStream> {
    let ticker = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut stream = PostStream::new(ticker);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Post>(line) {
            Ok(post) => stream.posts.push(post),
            Err(e) => {
                tracing::debug!(
                    "Skipping line {} of '{}': {}",
                    lineno + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    // "AAPL.jsonl" → "AAPL.returns.jsonl"
    let labels_path = path.with_extension("returns.jsonl");
    if labels_path.exists() {
        let content = fs::read_to_string(&labels_path)
            .with_context(|| format!("Cannot read '{}'", labels_path.display()))?;

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<MovementLabel>(line) {
                Ok(label) => stream.labels.push(label),
                Err(e) => {
                    tracing::debug!(
                        "Skipping line {} of '{}': {}",
                        lineno + 1,
                        labels_path.display(),
                        e
                    );
                }
            }
        }
    } else {
        tracing::debug!(
            "No returns file for '{}' — stream is inference-only",
            stream.ticker
        );
    }

    Ok(stream)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path, name: &str, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn loads_posts_and_sibling_labels() {
        let dir = std::env::temp_dir().join("tweet_stock_han_loader_test");
        let _ = fs::remove_dir_all(&dir);
        write_fixture(
            &dir,
            "AAPL.jsonl",
            r#"{"date": "2020-01-02", "text": "new phone looks great"}
{"date": "2020-01-03", "text": "supply chain rumours"}
"#,
        );
        write_fixture(
            &dir,
            "AAPL.returns.jsonl",
            r#"{"date": "2020-01-03", "movement": 0.012}
"#,
        );

        let streams = JsonlPostLoader::new(dir.to_string_lossy().to_string())
            .load_all()
            .unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].ticker, "AAPL");
        assert_eq!(streams[0].posts.len(), 2);
        assert_eq!(streams[0].labels.len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let dir = std::env::temp_dir().join("tweet_stock_han_loader_badline_test");
        let _ = fs::remove_dir_all(&dir);
        write_fixture(
            &dir,
            "TSLA.jsonl",
            r#"{"date": "2020-01-02", "text": "ok line"}
not json at all
{"date": "2020-01-03", "text": "another ok line"}
"#,
        );

        let streams = JsonlPostLoader::new(dir.to_string_lossy().to_string())
            .load_all()
            .unwrap();
        assert_eq!(streams[0].posts.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_yields_empty_corpus() {
        let loader = JsonlPostLoader::new("definitely/not/a/real/dir");
        let streams = loader.load_all().unwrap();
        assert!(streams.is_empty());
    }
}

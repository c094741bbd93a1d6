// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves, and reloads the word-level vocabulary.
//
// tokenizers 0.15 cannot run train_from_files here (its Trainer
// is typed to a different Model than the WordLevel wrapped in
// ModelWrapper), so the store writes the tokenizer JSON itself
// and loads it back — same end result, no trainer involved.
//
// Id layout, following the BERT convention plus the two
// placeholders the preprocessor emits:
//   [PAD]=0  [UNK]=1  [CLS]=101  [SEP]=102  [MASK]=103
//   [URL]=104  [USER]=105  words from 106 up
//
// The placeholders must be added_tokens with normalized=false:
// the BertNormalizer lowercases and the Whitespace pre-tokenizer
// splits on brackets, so a plain vocab entry would never match
// the literal "[URL]" the preprocessor writes.
//
// Reference: Devlin et al. (2019) BERT

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::Tokenizer;

/// First id available to regular vocabulary words
const FIRST_WORD_ID: usize = 106;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Reload the saved tokenizer, or build one from `texts` on
    /// the first run. Training and inference must share one
    /// vocabulary, so the built tokenizer always lands on disk.
    pub fn load_or_build(
        &self,
        texts:      &[String],
        vocab_size: usize,
    ) -> Result<Tokenizer> {
        if self.dir.join("tokenizer.json").exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join("tokenizer.json");
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir).ok();

        // Count words across the corpus, placeholders excluded
        // (they get special ids below). Lowercased to match the
        // normalizer; edge punctuation stripped so "moon!" and
        // "moon" share an id.
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                if word == "[URL]" || word == "[USER]" {
                    continue;
                }
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Most frequent words first. Ids run upward from
        // FIRST_WORD_ID and must stay below vocab_size, the size
        // of the encoder's token embedding table.
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1));
        words.truncate(vocab_size.saturating_sub(FIRST_WORD_ID));

        // Stripped corpus words never contain brackets, so they
        // cannot collide with the bracketed specials.
        let mut vocab = serde_json::Map::new();
        for (token, id) in [
            ("[PAD]", 0u64), ("[UNK]", 1), ("[CLS]", 101), ("[SEP]", 102),
            ("[MASK]", 103), ("[URL]", 104), ("[USER]", 105),
        ] {
            vocab.insert(token.to_string(), id.into());
        }
        for (i, (word, _)) in words.iter().enumerate() {
            vocab.insert(word.clone(), ((FIRST_WORD_ID + i) as u64).into());
        }

        // The on-disk format is what Tokenizer::from_file expects
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1,   "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 104, "content": "[URL]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 105, "content": "[USER]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let tok_path = self.dir.join("tokenizer.json");
        std::fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write '{}'", tok_path.display()))?;

        tracing::info!(
            "Tokenizer built with {} vocabulary words, saved to '{}'",
            words.len(),
            tok_path.display()
        );

        Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fresh_store(name: &str) -> (TokenizerStore, PathBuf) {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        (TokenizerStore::new(dir.to_string_lossy().to_string()), dir)
    }

    #[test]
    fn placeholders_encode_as_single_special_tokens() {
        let (store, dir) = fresh_store("tweet_stock_han_tokenizer_specials_test");
        let corpus = vec![
            "bullish on aapl [URL]".to_string(),
            "[USER] says hold through earnings".to_string(),
        ];

        let tok = store.load_or_build(&corpus, 200).unwrap();
        let enc = tok.encode("[URL] [USER]", false).unwrap();
        assert_eq!(enc.get_ids(), &[104, 105]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn word_ids_stay_below_vocab_size() {
        let (store, dir) = fresh_store("tweet_stock_han_tokenizer_cap_test");
        // 22 distinct words but only room for 4 regular ids (106..=109)
        let corpus: Vec<String> = (0..20).map(|i| format!("word{i} appears here")).collect();

        let vocab_size = 110;
        let tok = store.load_or_build(&corpus, vocab_size).unwrap();

        for (_, id) in tok.get_vocab(true) {
            assert!((id as usize) < vocab_size, "id {id} escapes the embedding table");
        }

        let _ = fs::remove_dir_all(&dir);
    }
}

// src/render.rs
//! Word cloud renderer contract.
//!
//! Rendering has no feedback into scoring, so it sits behind a trait with no
//! coupling to the aggregation core. Implementations must return a unique
//! artifact reference per invocation and must absorb their own failures:
//! `render` returns `None` instead of erroring.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::source::product_key;

#[async_trait]
pub trait WordCloudRenderer: Send + Sync {
    /// Render `text` (the concatenated sample texts) into an artifact and
    /// return an opaque reference to it, or `None` on any failure.
    async fn render(&self, text: &str, product: &str) -> Option<String>;
}

/// Renderer that renders nothing. Reports carry `word_cloud_ref: null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

#[async_trait]
impl WordCloudRenderer for DisabledRenderer {
    async fn render(&self, _text: &str, _product: &str) -> Option<String> {
        None
    }
}

/// Renderer that writes the word-frequency table feeding a cloud as a JSON
/// artifact. The filename carries a nanosecond suffix so concurrent renders
/// for the same product never collide.
#[derive(Debug, Clone)]
pub struct FrequencyArtifactRenderer {
    out_dir: PathBuf,
    max_words: usize,
}

impl FrequencyArtifactRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            max_words: 100,
        }
    }
}

#[async_trait]
impl WordCloudRenderer for FrequencyArtifactRenderer {
    async fn render(&self, text: &str, product: &str) -> Option<String> {
        if text.trim().is_empty() {
            warn!(product, "no text provided for word cloud");
            return None;
        }

        let freqs = word_frequencies(text, self.max_words);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let filename = format!("wc_{}_{}.json", product_key(product), nanos);
        let path = self.out_dir.join(&filename);

        let write = || -> std::io::Result<()> {
            std::fs::create_dir_all(&self.out_dir)?;
            let payload = serde_json::to_string_pretty(&freqs).unwrap_or_default();
            std::fs::write(&path, payload)
        };
        match write() {
            Ok(()) => {
                info!(product, path = %path.display(), "word cloud artifact written");
                Some(filename)
            }
            Err(e) => {
                warn!(product, error = %e, "word cloud render failed");
                None
            }
        }
    }
}

/// Top-N word frequency table over lower-cased alphabetic tokens, short
/// stop-words skipped.
fn word_frequencies(text: &str, max_words: usize) -> Vec<(String, u32)> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        let w = token.to_lowercase();
        if w.len() < 3 || is_stop_word(&w) {
            continue;
        }
        *counts.entry(w).or_insert(0) += 1;
    }
    let mut pairs: Vec<(String, u32)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.truncate(max_words);
    pairs
}

fn is_stop_word(w: &str) -> bool {
    matches!(
        w,
        "the" | "and" | "for" | "with" | "this" | "that" | "but" | "are" | "was" | "has"
            | "have" | "its" | "it's" | "you" | "your" | "not" | "very" | "just"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_out_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("wc_test_{tag}_{nanos}"))
    }

    #[test]
    fn frequencies_rank_and_truncate() {
        let freqs = word_frequencies("battery battery camera the the the", 10);
        assert_eq!(freqs[0], ("battery".to_string(), 2));
        assert_eq!(freqs[1], ("camera".to_string(), 1));
        assert!(!freqs.iter().any(|(w, _)| w == "the"));
    }

    #[tokio::test]
    async fn renders_unique_refs_per_invocation() {
        let renderer = FrequencyArtifactRenderer::new(temp_out_dir("unique"));
        let a = renderer.render("great battery life", "Phone X").await;
        let b = renderer.render("great battery life", "Phone X").await;
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn empty_text_yields_none() {
        let renderer = FrequencyArtifactRenderer::new(temp_out_dir("empty"));
        assert!(renderer.render("   ", "Phone X").await.is_none());
    }
}

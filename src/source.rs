// src/source.rs
//! Text source resolver: three-tier fallback that supplies sample texts for
//! a product when no live feed exists.
//!
//! Tier order, first non-empty wins:
//! 1. per-product dataset file (`<key>_tweets.json` under the dataset dir),
//! 2. shared pool partitioned into product-relevant and other samples,
//! 3. synthetic templated samples (always exactly `count`, unless disabled).
//!
//! Missing files are a normal condition; the resolver never errors on them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use metrics::counter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// Filesystem-safe correlation key for a product name: trimmed, lowercased,
/// whitespace and path separators replaced with `_`. Used for dataset file
/// names and ledger keys, never for display.
pub fn product_key(product: &str) -> String {
    product
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

#[derive(Debug)]
pub struct TextSourceResolver {
    dataset_dir: PathBuf,
    shared_pool: Vec<String>,
    synthetic_fallback: bool,
    rng: Mutex<StdRng>,
}

impl TextSourceResolver {
    /// Build a resolver over `dataset_dir`, loading the shared pool once.
    /// Entropy-seeded; prefer [`TextSourceResolver::with_seed`] in tests.
    pub fn new(dataset_dir: impl Into<PathBuf>, shared_pool_file: &str, synthetic_fallback: bool) -> Self {
        Self::build(dataset_dir.into(), shared_pool_file, synthetic_fallback, StdRng::from_os_rng())
    }

    /// Deterministic variant for reproducible shuffles and sampling.
    pub fn with_seed(
        dataset_dir: impl Into<PathBuf>,
        shared_pool_file: &str,
        synthetic_fallback: bool,
        seed: u64,
    ) -> Self {
        Self::build(
            dataset_dir.into(),
            shared_pool_file,
            synthetic_fallback,
            StdRng::seed_from_u64(seed),
        )
    }

    fn build(dataset_dir: PathBuf, shared_pool_file: &str, synthetic_fallback: bool, rng: StdRng) -> Self {
        let shared_pool = load_samples(&dataset_dir.join(shared_pool_file)).unwrap_or_default();
        if !shared_pool.is_empty() {
            info!(samples = shared_pool.len(), "loaded shared sample pool");
        }
        Self {
            dataset_dir,
            shared_pool,
            synthetic_fallback,
            rng: Mutex::new(rng),
        }
    }

    /// Produce up to `count` sample texts for `product`, plus an error string
    /// when every tier came up empty. The synthetic tier returns exactly
    /// `count` items; dataset tiers return at most `count`.
    pub fn resolve(&self, product: &str, count: usize) -> (Vec<String>, Option<String>) {
        let key = product_key(product);

        // Tier 1: per-product dataset.
        let path = self.dataset_dir.join(format!("{key}_tweets.json"));
        if let Some(mut samples) = load_samples(&path) {
            if !samples.is_empty() {
                info!(product, samples = samples.len(), path = %path.display(), "using per-product dataset");
                counter!("resolver_tier_total", "tier" => "product_dataset").increment(1);
                let mut rng = self.rng.lock().expect("resolver rng mutex poisoned");
                samples.shuffle(&mut *rng);
                samples.truncate(count);
                return (samples, None);
            }
        }

        // Tier 2: shared pool, relevant samples first.
        if !self.shared_pool.is_empty() {
            info!(product, pool = self.shared_pool.len(), "using shared sample pool");
            counter!("resolver_tier_total", "tier" => "shared_pool").increment(1);
            return (self.from_shared_pool(product, count), None);
        }

        // Tier 3: synthetic templates.
        if self.synthetic_fallback {
            info!(product, count, "no dataset data, generating synthetic samples");
            counter!("resolver_tier_total", "tier" => "synthetic").increment(1);
            return (self.synthetic_samples(product, count), None);
        }

        warn!(product, "all source tiers exhausted");
        counter!("resolver_tier_total", "tier" => "exhausted").increment(1);
        (
            Vec::new(),
            Some(format!("no sample data available for '{}'", product.trim())),
        )
    }

    /// Partition the shared pool by whether a sample contains any whitespace
    /// token of the product name, shuffle each partition independently, and
    /// take relevant-then-other up to `count`.
    fn from_shared_pool(&self, product: &str, count: usize) -> Vec<String> {
        let tokens: Vec<String> = product
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let (mut relevant, mut other): (Vec<String>, Vec<String>) =
            self.shared_pool.iter().cloned().partition(|s| {
                let lowered = s.to_lowercase();
                tokens.iter().any(|t| lowered.contains(t.as_str()))
            });

        let mut rng = self.rng.lock().expect("resolver rng mutex poisoned");
        relevant.shuffle(&mut *rng);
        other.shuffle(&mut *rng);

        let mut selection = relevant;
        if selection.len() < count {
            selection.append(&mut other);
        }
        selection.truncate(count);
        selection
    }

    /// Draw `count` samples with replacement from a small template set.
    fn synthetic_samples(&self, product: &str, count: usize) -> Vec<String> {
        let product = product.trim();
        let templates = [
            format!("Thinking about the {product}."),
            format!("Is the {product} any good?"),
            format!("The {product} has a nice design."),
            format!("My {product} battery is okay."),
            format!("Camera on the {product} seems decent."),
        ];
        let mut rng = self.rng.lock().expect("resolver rng mutex poisoned");
        (0..count)
            .map(|_| templates[rng.random_range(0..templates.len())].clone())
            .collect()
    }
}

/// Read a JSON array of strings. `None` on missing or unreadable file; a
/// present-but-malformed file logs a warning and also yields `None`.
fn load_samples(path: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Vec<String>>(&content) {
        Ok(samples) => Some(samples),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed dataset file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_key_is_filesystem_safe() {
        assert_eq!(product_key("  iPhone 15 Pro "), "iphone_15_pro");
        assert_eq!(product_key("a/b\\c"), "a_b_c");
        assert_eq!(product_key("Pixel\t9"), "pixel_9");
    }

    #[test]
    fn synthetic_tier_returns_exactly_count() {
        let r = TextSourceResolver::with_seed("does/not/exist", "shared_tweets.json", true, 7);
        let (samples, err) = r.resolve("Phone X", 37);
        assert_eq!(samples.len(), 37);
        assert!(err.is_none());
        assert!(samples.iter().all(|s| s.contains("Phone X")));
    }

    #[test]
    fn synthetic_disabled_yields_empty_with_error() {
        let r = TextSourceResolver::with_seed("does/not/exist", "shared_tweets.json", false, 7);
        let (samples, err) = r.resolve("Phone X", 10);
        assert!(samples.is_empty());
        assert!(err.is_some());
    }

    #[test]
    fn seeded_resolvers_are_reproducible() {
        let a = TextSourceResolver::with_seed("does/not/exist", "shared_tweets.json", true, 42);
        let b = TextSourceResolver::with_seed("does/not/exist", "shared_tweets.json", true, 42);
        assert_eq!(a.resolve("Phone X", 20).0, b.resolve("Phone X", 20).0);
    }
}

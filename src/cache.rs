// src/cache.rs
//! TTL cache for auxiliary lookup payloads (image URL, spec snippet).
//!
//! Keys are normalized to stay filesystem/store-safe. Expiry is lazy: a
//! stale entry is treated as a miss on read and left in place. Concurrent
//! writes to the same key are last-write-wins; payloads for the same key are
//! expected to be equivalent upstream.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

const MAX_KEY_CHARS: usize = 50;

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    payload: String,
}

/// Thread-safe key→payload cache with a TTL fixed at construction.
#[derive(Debug)]
pub struct LookupCache {
    inner: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl LookupCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Reference TTL from the original deployment: one hour.
    pub fn new_1h() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    /// Fresh payload for `key`, or `None` on miss/expiry.
    pub fn get(&self, key: &str) -> Option<String> {
        let key = normalize_key(key);
        let inner = self.inner.lock().expect("lookup cache mutex poisoned");
        let entry = inner.get(&key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            debug!(%key, "cache entry expired");
            return None;
        }
        debug!(%key, "cache hit");
        Some(entry.payload.clone())
    }

    /// Store or overwrite the payload for `key`.
    pub fn put(&self, key: &str, payload: impl Into<String>) {
        let key = normalize_key(key);
        let mut inner = self.inner.lock().expect("lookup cache mutex poisoned");
        inner.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                payload: payload.into(),
            },
        );
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Whitespace and path separators become `_`; length capped so normalized
/// keys stay usable as file or store names.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
        .take(MAX_KEY_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_after_put_returns_identical_payload() {
        let cache = LookupCache::new_1h();
        cache.put("image iphone 15", "https://example.test/a.png");
        assert_eq!(
            cache.get("image iphone 15").as_deref(),
            Some("https://example.test/a.png")
        );
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = LookupCache::with_ttl(Duration::from_millis(20));
        cache.put("k", "v");
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        // Sleep well over TTL to avoid boundary flakes.
        std::thread::sleep(Duration::from_millis(100));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn overwrite_wins() {
        let cache = LookupCache::new_1h();
        cache.put("k", "first");
        cache.put("k", "second");
        assert_eq!(cache.get("k").as_deref(), Some("second"));
    }

    #[test]
    fn keys_are_normalized_and_bounded() {
        assert_eq!(normalize_key("a b/c\\d"), "a_b_c_d");
        let long = "x".repeat(200);
        assert_eq!(normalize_key(&long).chars().count(), 50);
        // Normalized and raw spellings address the same slot.
        let cache = LookupCache::new_1h();
        cache.put("spec iphone/15", "s");
        assert_eq!(cache.get("spec_iphone_15").as_deref(), Some("s"));
    }
}

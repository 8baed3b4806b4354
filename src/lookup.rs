// src/lookup.rs
//! External lookup collaborator seam.
//!
//! The actual lookup (a search API, a scraper, a fixture) lives outside this
//! crate behind [`ExternalLookup`]. [`CachedLookup`] adds the TTL cache, a
//! timeout bound, and the multi-query fallback used for product image URLs
//! and spec snippets. Every failure path degrades to `None`; nothing here
//! can abort a report.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::error::LookupError;

/// What kind of payload the collaborator should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Text,
    Image,
}

impl LookupKind {
    fn as_str(self) -> &'static str {
        match self {
            LookupKind::Text => "text",
            LookupKind::Image => "image",
        }
    }
}

/// Best-effort, fallible, possibly rate-limited external lookup.
#[async_trait]
pub trait ExternalLookup: Send + Sync {
    /// `Ok(None)` means "nothing found", which is a normal outcome.
    async fn lookup(&self, query: &str, kind: LookupKind) -> Result<Option<String>, LookupError>;
}

/// Lookup that never finds anything, for callers without a collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLookup;

#[async_trait]
impl ExternalLookup for NoopLookup {
    async fn lookup(&self, _query: &str, _kind: LookupKind) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}

/// Cache-backed, timeout-bounded front for an [`ExternalLookup`].
pub struct CachedLookup {
    inner: Arc<dyn ExternalLookup>,
    cache: LookupCache,
    timeout: Duration,
}

impl CachedLookup {
    pub fn new(inner: Arc<dyn ExternalLookup>, cache: LookupCache, timeout: Duration) -> Self {
        Self {
            inner,
            cache,
            timeout,
        }
    }

    /// Best-effort product image URL: first query that yields a payload wins.
    pub async fn product_image_url(&self, product: &str) -> Option<String> {
        let queries = [
            format!("{product} official product image"),
            format!("{product} product photo"),
        ];
        for q in &queries {
            if let Some(url) = self.fetch(q, LookupKind::Image).await {
                return Some(url);
            }
        }
        None
    }

    /// Best-effort specification snippet.
    pub async fn spec_snippet(&self, product: &str) -> Option<String> {
        let queries = [
            format!("{product} key specifications list"),
            format!("{product} official tech specs"),
        ];
        for q in &queries {
            if let Some(snippet) = self.fetch(q, LookupKind::Text).await {
                return Some(snippet);
            }
        }
        None
    }

    /// One cached, timeout-bounded query. Timeouts and upstream errors are
    /// logged and absorbed into `None`.
    async fn fetch(&self, query: &str, kind: LookupKind) -> Option<String> {
        let cache_key = format!("{}_{}", kind.as_str(), query);
        if let Some(hit) = self.cache.get(&cache_key) {
            return Some(hit);
        }

        let result = tokio::time::timeout(self.timeout, self.inner.lookup(query, kind)).await;
        match result {
            Ok(Ok(Some(payload))) => {
                self.cache.put(&cache_key, payload.clone());
                Some(payload)
            }
            Ok(Ok(None)) => {
                debug!(query, kind = kind.as_str(), "lookup found nothing");
                None
            }
            Ok(Err(e)) => {
                warn!(query, kind = kind.as_str(), error = %e, "lookup failed");
                counter!("lookup_failures_total", "kind" => kind.as_str()).increment(1);
                None
            }
            Err(_) => {
                warn!(query, kind = kind.as_str(), timeout = ?self.timeout, "lookup timed out");
                counter!("lookup_timeouts_total", "kind" => kind.as_str()).increment(1);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and answers only image queries.
    struct ImageOnly {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExternalLookup for ImageOnly {
        async fn lookup(
            &self,
            _query: &str,
            kind: LookupKind,
        ) -> Result<Option<String>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match kind {
                LookupKind::Image => Some("https://example.test/img.png".to_string()),
                LookupKind::Text => None,
            })
        }
    }

    struct Stuck;

    #[async_trait]
    impl ExternalLookup for Stuck {
        async fn lookup(
            &self,
            _query: &str,
            _kind: LookupKind,
        ) -> Result<Option<String>, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn image_found_and_cached() {
        let inner = Arc::new(ImageOnly {
            calls: AtomicUsize::new(0),
        });
        let lookup = CachedLookup::new(
            inner.clone(),
            LookupCache::new_1h(),
            Duration::from_secs(1),
        );

        let first = lookup.product_image_url("Phone X").await;
        assert_eq!(first.as_deref(), Some("https://example.test/img.png"));
        let calls_after_first = inner.calls.load(Ordering::SeqCst);

        let second = lookup.product_image_url("Phone X").await;
        assert_eq!(second, first);
        // Second round is served from cache.
        assert_eq!(inner.calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn text_miss_degrades_to_none() {
        let lookup = CachedLookup::new(
            Arc::new(ImageOnly {
                calls: AtomicUsize::new(0),
            }),
            LookupCache::new_1h(),
            Duration::from_secs(1),
        );
        assert!(lookup.spec_snippet("Phone X").await.is_none());
    }

    #[tokio::test]
    async fn timeout_degrades_to_none() {
        let lookup = CachedLookup::new(
            Arc::new(Stuck),
            LookupCache::new_1h(),
            Duration::from_millis(20),
        );
        assert!(lookup.product_image_url("Phone X").await.is_none());
    }
}

// src/ledger.rs
//! Running-average reputation ledger, one entry per product.
//!
//! The merge is an *iterative* weighted average: each step re-rounds, so
//! repeated analyses accumulate rounding drift on purpose — this matches the
//! reference behavior and must not be replaced with a from-raw-sums
//! recomputation.
//!
//! Storage is external to this core: [`LedgerStore`] exposes fetch and a
//! compare-and-commit keyed on `analysis_count`, so same-product merges
//! either serialize or surface [`LedgerError::Conflict`] and get retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::source::product_key;
use crate::types::{round3, AnalysisReport};

const MERGE_RETRIES: usize = 5;

/// Persistent running-average record for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub product: String,
    pub overall_score: f64,
    pub positive_count: u32,
    pub negative_count: u32,
    pub neutral_count: u32,
    pub tweets_count: u32,
    pub analysis_count: u32,
    pub last_updated: DateTime<Utc>,
}

/// Merge a fresh report into an existing entry (or create one). Score keeps
/// 3-decimal precision; counts round to the nearest integer at every step.
pub fn merge(existing: Option<&LedgerEntry>, report: &AnalysisReport, now: DateTime<Utc>) -> LedgerEntry {
    match existing {
        None => LedgerEntry {
            product: report.product.clone(),
            overall_score: report.overall_score,
            positive_count: report.overall_counts.positive,
            negative_count: report.overall_counts.negative,
            neutral_count: report.overall_counts.neutral,
            tweets_count: report.tweets_count,
            analysis_count: 1,
            last_updated: now,
        },
        Some(prev) => {
            let n = f64::from(prev.analysis_count);
            let w = n + 1.0;
            let avg_count = |old: u32, new: u32| -> u32 {
                ((f64::from(old) * n + f64::from(new)) / w).round() as u32
            };
            LedgerEntry {
                product: prev.product.clone(),
                overall_score: round3((prev.overall_score * n + report.overall_score) / w),
                positive_count: avg_count(prev.positive_count, report.overall_counts.positive),
                negative_count: avg_count(prev.negative_count, report.overall_counts.negative),
                neutral_count: avg_count(prev.neutral_count, report.overall_counts.neutral),
                tweets_count: avg_count(prev.tweets_count, report.tweets_count),
                analysis_count: prev.analysis_count + 1,
                last_updated: now,
            }
        }
    }
}

/// Storage backend seam. `expected_analyses` is 0 when committing a brand
/// new entry; a mismatch with the stored entry means a concurrent merge won
/// and the commit must fail with [`LedgerError::Conflict`].
pub trait LedgerStore: Send + Sync {
    fn fetch(&self, product_key: &str) -> Result<Option<LedgerEntry>, LedgerError>;
    fn commit(
        &self,
        product_key: &str,
        expected_analyses: u32,
        entry: LedgerEntry,
    ) -> Result<(), LedgerError>;
    fn list(&self) -> Result<Vec<LedgerEntry>, LedgerError>;
}

/// In-memory store with compare-and-swap on `analysis_count`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<HashMap<String, LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedger {
    fn fetch(&self, product_key: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner.get(product_key).cloned())
    }

    fn commit(
        &self,
        product_key: &str,
        expected_analyses: u32,
        entry: LedgerEntry,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().expect("ledger mutex poisoned");
        let current = inner.get(product_key).map(|e| e.analysis_count).unwrap_or(0);
        if current != expected_analyses {
            return Err(LedgerError::Conflict {
                product: entry.product,
            });
        }
        inner.insert(product_key.to_string(), entry);
        Ok(())
    }

    fn list(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let inner = self.inner.lock().expect("ledger mutex poisoned");
        Ok(inner.values().cloned().collect())
    }
}

/// Merge orchestration over a store: read, merge, compare-and-commit, retry
/// on conflict.
pub struct ScoreLedger {
    store: Arc<dyn LedgerStore>,
}

impl ScoreLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedger::new()))
    }

    /// Merge `report` into the product's running entry and return the new
    /// state. Conflicted commits are retried with a fresh read; dropping an
    /// update silently is not an option.
    pub fn record(&self, report: &AnalysisReport) -> Result<LedgerEntry, LedgerError> {
        let key = product_key(&report.product);
        let mut last_err = None;
        for attempt in 0..MERGE_RETRIES {
            let existing = self.store.fetch(&key)?;
            let expected = existing.as_ref().map(|e| e.analysis_count).unwrap_or(0);
            let merged = merge(existing.as_ref(), report, Utc::now());
            match self.store.commit(&key, expected, merged.clone()) {
                Ok(()) => {
                    debug!(product = %report.product, analyses = merged.analysis_count, "ledger merged");
                    return Ok(merged);
                }
                Err(e) => {
                    warn!(product = %report.product, attempt, "ledger commit conflicted, retrying");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(LedgerError::Conflict {
            product: report.product.clone(),
        }))
    }

    pub fn get(&self, product: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        self.store.fetch(&product_key(product))
    }

    /// Products ranked by running score, best first.
    pub fn top_n(&self, n: usize) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries = self.store.list()?;
        entries.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries.truncate(n);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SentimentCounts;
    use std::collections::BTreeMap;

    fn report(product: &str, score: f64, counts: (u32, u32, u32), tweets: u32) -> AnalysisReport {
        AnalysisReport {
            product: product.to_string(),
            tweets_count: tweets,
            overall_counts: SentimentCounts {
                positive: counts.0,
                negative: counts.1,
                neutral: counts.2,
            },
            overall_score: score,
            aspects: BTreeMap::new(),
            samples: Vec::new(),
            image_url: None,
            spec_snippet: None,
            word_cloud_ref: None,
            error: None,
        }
    }

    #[test]
    fn first_merge_creates_entry() {
        let entry = merge(None, &report("Phone X", 0.42, (10, 5, 5), 20), Utc::now());
        assert_eq!(entry.analysis_count, 1);
        assert_eq!(entry.overall_score, 0.42);
        assert_eq!(entry.positive_count, 10);
        assert_eq!(entry.tweets_count, 20);
    }

    #[test]
    fn second_merge_weighted_average() {
        let now = Utc::now();
        let first = merge(None, &report("Phone X", 0.2, (10, 0, 0), 10), now);
        let second = merge(Some(&first), &report("Phone X", 0.4, (20, 0, 0), 20), now);
        assert_eq!(second.overall_score, 0.3);
        assert_eq!(second.analysis_count, 2);
        assert_eq!(second.positive_count, 15);
        assert_eq!(second.tweets_count, 15);
    }

    #[test]
    fn count_rounding_is_nearest_integer() {
        let now = Utc::now();
        let first = merge(None, &report("p", 0.0, (1, 0, 0), 1), now);
        // (1*1 + 2)/2 = 1.5 -> rounds to 2
        let second = merge(Some(&first), &report("p", 0.0, (2, 0, 0), 2), now);
        assert_eq!(second.positive_count, 2);
    }

    #[test]
    fn record_creates_then_merges() {
        let ledger = ScoreLedger::in_memory();
        let e1 = ledger.record(&report("Phone X", 0.2, (1, 0, 0), 1)).unwrap();
        assert_eq!(e1.analysis_count, 1);
        let e2 = ledger.record(&report("Phone X", 0.4, (1, 0, 0), 1)).unwrap();
        assert_eq!(e2.analysis_count, 2);
        assert_eq!(e2.overall_score, 0.3);
    }

    #[test]
    fn product_keying_is_normalized() {
        let ledger = ScoreLedger::in_memory();
        ledger.record(&report("Phone X", 0.2, (1, 0, 0), 1)).unwrap();
        let fetched = ledger.get("  phone x ").unwrap();
        assert!(fetched.is_some());
    }

    #[test]
    fn stale_commit_conflicts() {
        let store = MemoryLedger::new();
        let now = Utc::now();
        let entry = merge(None, &report("p", 0.1, (1, 0, 0), 1), now);
        store.commit("p", 0, entry.clone()).unwrap();
        // A second writer that also read "absent" must not clobber.
        let err = store.commit("p", 0, entry).unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));
    }

    #[test]
    fn top_n_ranks_by_running_score() {
        let ledger = ScoreLedger::in_memory();
        ledger.record(&report("low", -0.2, (0, 1, 0), 1)).unwrap();
        ledger.record(&report("high", 0.8, (1, 0, 0), 1)).unwrap();
        ledger.record(&report("mid", 0.3, (1, 0, 0), 1)).unwrap();
        let top = ledger.top_n(2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product, "high");
        assert_eq!(top[1].product, "mid");
    }
}

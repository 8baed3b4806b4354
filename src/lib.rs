// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod aspects;
pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lookup;
pub mod render;
pub mod sentiment;
pub mod source;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::ReportAggregator;
pub use crate::config::AnalyzerConfig;
pub use crate::error::{LedgerError, LookupError};
pub use crate::ledger::{merge, LedgerEntry, LedgerStore, MemoryLedger, ScoreLedger};
pub use crate::lookup::{ExternalLookup, LookupKind, NoopLookup};
pub use crate::render::{DisabledRenderer, FrequencyArtifactRenderer, WordCloudRenderer};
pub use crate::sentiment::SentimentAnalyzer;
pub use crate::source::{product_key, TextSourceResolver};
pub use crate::types::{AnalysisReport, AspectRecord, SampleVerdict, SentimentCounts, SentimentLabel};

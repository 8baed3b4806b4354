// src/types.rs
//! Record types shared across the analysis pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Polarity label for one text unit. Only equality is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Tallies of per-sample overall labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

impl SentimentCounts {
    pub fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.positive + self.negative + self.neutral
    }
}

/// Per-aspect tallies. `mentions` counts at most once per sample; the label
/// counters accumulate per sentence, so their sum may exceed `mentions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRecord {
    pub mentions: u32,
    pub positive: u32,
    pub negative: u32,
    pub neutral: u32,
}

/// One classified sample kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleVerdict {
    pub text: String,
    pub label: SentimentLabel,
}

/// The product of one `analyze` call. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub product: String,
    pub tweets_count: u32,
    pub overall_counts: SentimentCounts,
    /// Mean of per-sample compound scores, rounded to 3 decimals.
    pub overall_score: f64,
    /// Only aspects with `mentions >= 2` survive aggregation.
    pub aspects: BTreeMap<String, AspectRecord>,
    /// At most 5 representative classified samples.
    pub samples: Vec<SampleVerdict>,
    pub image_url: Option<String>,
    pub spec_snippet: Option<String>,
    pub word_cloud_ref: Option<String>,
    pub error: Option<String>,
}

/// Round to 3 decimal places. The ledger arithmetic depends on this exact
/// precision, so every surfaced score goes through here.
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

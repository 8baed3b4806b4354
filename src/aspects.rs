// src/aspects.rs
//! Keyword-table-driven aspect tagger.
//!
//! Splits a sample into sentences, labels each sentence with the lexicon
//! scorer, and tallies label counts per aspect whose keyword set matches the
//! sentence. Mentions dedup per sample: an aspect named in two sentences of
//! the same sample still counts one mention (but two label increments).

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::sentiment::SentimentAnalyzer;
use crate::types::{AspectRecord, SentimentLabel};

/// Aspect name → lower-cased keyword substrings.
pub static ASPECT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "battery",
        &["battery", "charge", "charging", "mah", "backup", "lasts", "battery life"],
    ),
    (
        "camera",
        &[
            "camera", "photo", "picture", "lens", "image", "video", "shot", "sensor", "zoom",
            "pixel", "focus", "megapixel", "selfie",
        ],
    ),
    (
        "screen",
        &[
            "screen", "display", "resolution", "amoled", "oled", "lcd", "brightness", "hdr",
            "refresh rate",
        ],
    ),
    (
        "performance",
        &[
            "performance", "speed", "fast", "slow", "lag", "chip", "processor", "ram", "gaming",
            "smooth", "benchmark",
        ],
    ),
    (
        "price",
        &[
            "price", "cost", "value", "cheap", "expensive", "budget", "affordable", "money",
            "worth", "deal",
        ],
    ),
    (
        "design",
        &[
            "design", "look", "feel", "build", "aesthetic", "style", "beautiful", "ugly",
            "premium", "color", "material", "titanium",
        ],
    ),
    (
        "software",
        &["software", "os", "ui", "update", "app", "bloatware", "interface", "android", "ios"],
    ),
    (
        "sound",
        &["sound", "audio", "speaker", "music", "volume", "microphone", "call quality"],
    ),
    (
        "durability",
        &["durability", "strong", "robust", "scratch", "waterproof", "resistant", "ip68"],
    ),
    (
        "features",
        &[
            "feature", "functionality", "fingerprint", "face id", "nfc", "5g",
            "wireless charging", "storage", "usb-c", "connectivity",
        ],
    ),
    ("heating", &["heat", "hot", "warm", "overheating", "overheats", "cool"]),
    (
        "overall",
        &[
            "love it", "hate it", "amazing", "disappointed", "best phone", "worst phone",
            "recommend", "impressed", "regret",
        ],
    ),
];

static RE_SENTENCES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+").expect("sentence regex"));

/// Stateless sentence-level classifier over the fixed aspect table.
#[derive(Debug, Clone, Default)]
pub struct AspectTagger {
    analyzer: SentimentAnalyzer,
}

impl AspectTagger {
    pub fn new(analyzer: SentimentAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Per-aspect deltas contributed by one sample. `mentions` is 0 or 1 per
    /// aspect regardless of how many sentences matched.
    pub fn tag(&self, sample: &str) -> BTreeMap<&'static str, AspectRecord> {
        let mut deltas: BTreeMap<&'static str, AspectRecord> = BTreeMap::new();
        let mut mentioned: HashSet<&'static str> = HashSet::new();

        for sentence in split_sentences(sample) {
            let lowered = sentence.to_lowercase();
            let (label, _) = self.analyzer.classify(&sentence);

            for (aspect, keywords) in ASPECT_KEYWORDS {
                if !keywords.iter().any(|kw| lowered.contains(kw)) {
                    continue;
                }
                let rec = deltas.entry(aspect).or_default();
                if mentioned.insert(aspect) {
                    rec.mentions += 1;
                }
                match label {
                    SentimentLabel::Positive => rec.positive += 1,
                    SentimentLabel::Negative => rec.negative += 1,
                    SentimentLabel::Neutral => rec.neutral += 1,
                }
            }
        }

        deltas
    }
}

/// Split into sentences on terminal punctuation. A sample the splitter cannot
/// break up degrades to a single whole-sample sentence rather than being
/// dropped.
fn split_sentences(sample: &str) -> Vec<String> {
    let sentences: Vec<String> = RE_SENTENCES
        .find_iter(sample)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() && !sample.trim().is_empty() {
        debug!(len = sample.len(), "sentence split produced nothing, using whole sample");
        return vec![sample.trim().to_string()];
    }
    sentences
}

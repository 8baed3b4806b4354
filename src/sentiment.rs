// src/sentiment.rs
//! Lexicon-based polarity scorer.
//!
//! Pure and stateless beyond the embedded lexicon: word valences are summed
//! with negation / intensifier / punctuation adjustments and normalized into
//! a compound score in `[-1.0, 1.0]`.
//!
//! Label thresholds are a contract shared with the report aggregator and the
//! score ledger: `>= 0.05` positive, `<= -0.05` negative, else neutral.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::types::SentimentLabel;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

/// Sign-inverting damp applied when a negator precedes a valenced word.
const NEGATION_SCALAR: f64 = -0.74;
/// Magnitude added (intensifier) or removed (dampener) by a nearby booster.
const BOOSTER_STEP: f64 = 0.293;
/// Per-`!` emphasis added to the raw sum, capped at three marks.
const EXCLAMATION_STEP: f64 = 0.292;
/// Normalization constant: `sum / sqrt(sum^2 + ALPHA)`.
const NORMALIZATION_ALPHA: f64 = 15.0;

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_valence(&self, w: &str) -> f64 {
        *LEXICON.get(w).unwrap_or(&0.0)
    }

    /// Compound score for one text unit, in `[-1.0, 1.0]`.
    ///
    /// A negator within the previous 1..=3 tokens inverts and damps the
    /// word's valence. Boosters within the previous 1..=2 tokens push the
    /// magnitude up or down. Exclamation marks amplify the raw sum before
    /// normalization.
    pub fn compound(&self, text: &str) -> f64 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0.0_f64;

        for i in 0..tokens.len() {
            let mut valence = self.word_valence(tokens[i].as_str());
            if valence == 0.0 {
                continue;
            }

            for k in 1..=2 {
                if i >= k {
                    let boost = booster_step(tokens[i - k].as_str());
                    if boost != 0.0 {
                        valence += if valence > 0.0 { boost } else { -boost };
                    }
                }
            }

            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            if negated {
                valence *= NEGATION_SCALAR;
            }

            sum += valence;
        }

        if sum != 0.0 {
            let excl = text.matches('!').count().min(3) as f64 * EXCLAMATION_STEP;
            sum += if sum > 0.0 { excl } else { -excl };
        }

        let norm = sum / (sum * sum + NORMALIZATION_ALPHA).sqrt();
        norm.clamp(-1.0, 1.0)
    }

    /// Classify one text unit. The threshold policy must not change.
    pub fn classify(&self, text: &str) -> (SentimentLabel, f64) {
        let compound = self.compound(text);
        let label = if compound >= 0.05 {
            SentimentLabel::Positive
        } else if compound <= -0.05 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        (label, compound)
    }
}

/// Lower-cased tokens; apostrophes stay inside tokens so contractions like
/// "isn't" survive as single negators.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|t| t.trim_matches('\'').to_ascii_lowercase())
        .filter(|t| !t.is_empty())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "neither"
            | "nor"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "can't"
            | "cannot"
            | "couldn't"
            | "shouldn't"
            | "wouldn't"
            | "without"
            | "hardly"
    )
}

/// Positive step for intensifiers, negative for dampeners, 0 otherwise.
fn booster_step(tok: &str) -> f64 {
    match tok {
        "very" | "really" | "extremely" | "absolutely" | "incredibly" | "so" | "totally"
        | "super" | "insanely" => BOOSTER_STEP,
        "slightly" | "somewhat" | "kinda" | "kind" | "marginally" | "bit" => -BOOSTER_STEP,
        _ => 0.0,
    }
}
